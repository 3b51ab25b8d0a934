//! Process pipe tests against `/bin/sh` standing in for ffmpeg.

#![cfg(unix)]

use std::io::Write;
use std::path::PathBuf;

use demorec_encoder::{EncoderCommand, FfmpegLauncher, PipeLauncher};

fn shell(script: &str, output: PathBuf) -> EncoderCommand {
    EncoderCommand {
        program: PathBuf::from("/bin/sh"),
        args: vec!["-c".to_string(), script.to_string()],
        output,
        pass_index: 0,
    }
}

#[test]
fn test_frames_reach_the_process() {
    let dir = std::env::temp_dir().join("demorec_test_pipe_cat");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let out = dir.join("frames.raw");

    let command = shell(&format!("cat > '{}'", out.display()), out.clone());
    let mut pipe = FfmpegLauncher::new().open(&command).unwrap();
    let frame = vec![0x7fu8; 4 * 4 * 4];
    pipe.write_all(&frame).unwrap();
    pipe.write_all(&frame).unwrap();
    pipe.finish().unwrap();

    let written = std::fs::read(&out).unwrap();
    assert_eq!(written.len(), frame.len() * 2);
    assert!(written.iter().all(|b| *b == 0x7f));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_nonzero_exit_is_an_encoder_error() {
    let command = shell("cat > /dev/null; echo 'bad codec' >&2; exit 3", PathBuf::from("unused"));
    let mut pipe = FfmpegLauncher::new().open(&command).unwrap();
    pipe.write_all(&[0u8; 16]).unwrap();

    let err = pipe.finish().unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Encoder error:"), "{message}");
    assert!(message.contains("bad codec"), "{message}");
}

#[test]
fn test_missing_program_is_encoder_not_found() {
    let command = EncoderCommand {
        program: PathBuf::from("/nonexistent/demorec/ffmpeg"),
        args: Vec::new(),
        output: PathBuf::from("unused"),
        pass_index: 0,
    };
    match FfmpegLauncher::new().open(&command) {
        Err(err) => assert!(err.is_encoder_not_found()),
        Ok(_) => panic!("expected spawn failure"),
    }
}
