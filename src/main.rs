// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use clipthumb_lib::commands;
use clipthumb_lib::{Session, Settings};
use std::sync::Arc;
use tauri::Manager;
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let settings = Settings::load().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default settings");
        let mut settings = Settings::default();
        settings.apply_env_overrides();
        settings
    });

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(move |app| {
            let session = Arc::new(Session::connect(settings, Arc::new(app.handle().clone()))?);
            app.manage(Arc::clone(&session));

            // Open the drop zone once the startup delay has passed
            tokio::spawn(async move {
                session.initialize().await;
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::select_file,
            commands::drop_file,
            commands::set_parameters,
            commands::submit_generation,
            commands::cancel_generation,
            commands::get_session,
            commands::download_image,
            commands::select_folder
        ])
        .run(tauri::generate_context!())?;

    Ok(())
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("clipthumb=info,clipthumb_lib=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
