//! Tauri commands: the webview's only way into the session.

use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use tauri::State;
use tracing::{error, warn};

use crate::form::parse_style_field;
use crate::session::{Session, SessionSnapshot};

pub type SessionHandle = Arc<Session>;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mkv", "mov", "webm", "avi"];

#[tauri::command]
pub async fn select_file(session: State<'_, SessionHandle>) -> Result<Option<String>, String> {
    let picked = FileDialog::new()
        .set_directory(".")
        .add_filter("Video files", VIDEO_EXTENSIONS)
        .pick_file();

    match picked {
        Some(path) => load_path(&session, path).await,
        None => Ok(None),
    }
}

/// Path dropped onto the window.
#[tauri::command]
pub async fn drop_file(
    path: String,
    session: State<'_, SessionHandle>,
) -> Result<Option<String>, String> {
    load_path(&session, PathBuf::from(path)).await
}

async fn load_path(session: &Session, path: PathBuf) -> Result<Option<String>, String> {
    session.select_path(&path).await.map_err(|e| {
        error!(path = %path.display(), error = %e, "Failed to read file");
        format!("Failed to read file: {}", e)
    })
}

#[tauri::command]
pub fn set_parameters(
    style: String,
    color: String,
    session: State<'_, SessionHandle>,
) -> Result<(), String> {
    let style = parse_style_field(&style).map_err(|e| e.to_string())?;
    session.set_parameters(style, color);
    Ok(())
}

#[tauri::command]
pub async fn submit_generation(session: State<'_, SessionHandle>) -> Result<(), String> {
    session.submit().await.map_err(|e| match e.user_message() {
        Some(message) => message.to_string(),
        None => e.to_string(),
    })
}

#[tauri::command]
pub fn cancel_generation(session: State<'_, SessionHandle>) -> bool {
    session.cancel()
}

#[tauri::command]
pub fn get_session(session: State<'_, SessionHandle>) -> SessionSnapshot {
    session.snapshot()
}

#[tauri::command]
pub fn download_image(session: State<'_, SessionHandle>) -> Result<Option<String>, String> {
    session
        .download()
        .map(|saved| saved.map(|path| path.display().to_string()))
        .map_err(|e| {
            error!(error = %e, "Download failed");
            e.to_string()
        })
}

/// Pick the folder downloads go to and remember it.
#[tauri::command]
pub async fn select_folder(session: State<'_, SessionHandle>) -> Result<Option<String>, String> {
    let Some(dir) = FileDialog::new().set_directory(".").pick_folder() else {
        return Ok(None);
    };

    let settings = session.set_download_dir(dir.clone());
    if let Err(e) = settings.save() {
        warn!(error = %e, "Could not persist download folder");
    }
    Ok(Some(dir.display().to_string()))
}
