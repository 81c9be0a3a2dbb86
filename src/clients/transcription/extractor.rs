use std::path::Path;
use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::util::AppError;

/// Extract a mono 64 kbit/s MP3 track from a video file with ffmpeg.
///
/// The returned handle deletes the audio file on drop, so the caller keeps
/// cleanup guarantees on every exit path.
pub(crate) async fn extract_audio(video_path: &Path) -> Result<NamedTempFile, AppError> {
    let audio_file = tempfile::Builder::new()
        .prefix("audio-")
        .suffix(".mp3")
        .tempfile()
        .map_err(|error| {
            AppError::transcription(format!("failed to create temp audio file: {error}"), 500)
        })?;

    let status = Command::new("ffmpeg")
        .arg("-i")
        .arg(video_path)
        .arg("-vn")
        .arg("-acodec")
        .arg("libmp3lame")
        .arg("-ab")
        .arg("64k")
        .arg("-y")
        .arg(audio_file.path())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|error| {
            AppError::transcription(format!("failed to run ffmpeg: {error}"), 500)
        })?;

    if !status.success() {
        return Err(AppError::transcription(
            format!("ffmpeg exited with {status}"),
            500,
        ));
    }

    Ok(audio_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn garbage_input_yields_transcription_error() {
        let mut video = tempfile::Builder::new()
            .prefix("video-")
            .suffix(".mp4")
            .tempfile()
            .expect("temp file");
        video.write_all(b"definitely not a video").expect("write");

        // fails whether ffmpeg is missing or rejects the input
        let error = extract_audio(video.path())
            .await
            .expect_err("extraction should fail");
        assert_eq!(error.code(), "TRANSCRIPTION_ERROR");
    }
}
