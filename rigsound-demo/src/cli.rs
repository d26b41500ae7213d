use anyhow::{Context, Result, bail};
use rigsound::{AudioDesc, AudioEvent, AudioSystem, ChannelRole, DecodedAudio, Vec3};
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

/// Walks through what the viewer does with sound: start up, preload, move the camera around
/// the case while clicking, stepping and taking parts out.
pub fn run_scripted_session() -> Result<()> {
    let mut audio = AudioSystem::new(AudioDesc::default());
    audio.init().context("Failed to open the audio device")?;

    let ready = audio.preload_defaults();
    log::info!("Preloaded {}/{} sounds", ready, audio.desc().preload.len());
    drain_events(&audio);

    log::info!("=== UI clicks ===");
    for _ in 0..3 {
        audio.play_ui("data/sfx/ui_click.wav", 1.0);
        sleep_frames(&audio, 15);
    }
    audio.play_ui("data/sfx/enter.wav", 1.0);
    sleep_frames(&audio, 60);

    log::info!("=== Orbiting the case ===");
    let case_center = Vec3::new(0.0, 0.5, 0.0);
    let steps = 240;
    for i in 0..steps {
        let angle = i as f32 / steps as f32 * std::f32::consts::TAU;
        let eye = case_center + Vec3::new(angle.sin() * 4.0, 1.1, angle.cos() * 4.0);
        audio.update_listener(eye, case_center - eye, Vec3::Y);

        if i % 30 == 0 {
            audio.play_step("data/sfx/step.wav", 0.6);
        }
        if i == steps / 4 {
            audio.play3d(
                "data/sfx/disassemble.wav",
                Vec3::new(0.3, 0.8, 0.2),
                1.0,
                Some(ChannelRole::Action),
            );
        }
        if i == steps * 3 / 4 {
            audio.play3d(
                "data/sfx/assemble.wav",
                Vec3::new(0.3, 0.8, 0.2),
                1.0,
                Some(ChannelRole::Action),
            );
        }
        std::thread::sleep(FRAME);
        drain_events(&audio);
    }

    log::info!("=== Overlapping one-shots ===");
    for x in [-6.0, -2.0, 2.0, 6.0] {
        audio.play_oneshot("data/sfx/ui_click.wav", Vec3::new(x, 0.0, -3.0), 1.0);
        sleep_frames(&audio, 4);
    }
    log::info!("Pool holds {} voices", audio.pool_len());
    sleep_frames(&audio, 60);

    audio.stop_all();
    audio.shutdown();
    log::info!("Scripted session completed");
    Ok(())
}

/// Plays one WAV file in front of the listener until it ends.
pub fn play_file(path: &str) -> Result<()> {
    let decoded =
        DecodedAudio::from_path(path).with_context(|| format!("Failed to decode {}", path))?;
    log::info!(
        "{}: {} ch, {} Hz, {} bit, {:.2}s",
        path,
        decoded.channels(),
        decoded.sample_rate(),
        decoded.bits_per_sample(),
        decoded.duration().as_secs_f32()
    );

    let mut audio = AudioSystem::new(AudioDesc::default().preload([path]));
    audio.init().context("Failed to open the audio device")?;
    if audio.preload_defaults() == 0 {
        bail!("{} could not be uploaded", path);
    }

    audio.play_oneshot(path, Vec3::new(0.0, 0.0, -1.0), 1.0);
    std::thread::sleep(decoded.duration() + Duration::from_millis(250));
    drain_events(&audio);

    audio.shutdown();
    Ok(())
}

fn sleep_frames(audio: &AudioSystem, frames: u32) {
    for _ in 0..frames {
        std::thread::sleep(FRAME);
    }
    drain_events(audio);
}

fn drain_events(audio: &AudioSystem) {
    for event in audio.poll_events() {
        match event {
            AudioEvent::SoundLoaded { path } => log::info!("Loaded {}", path),
            AudioEvent::SoundFailed { path, error } => {
                log::warn!("Could not load {}: {}", path, error)
            }
            AudioEvent::VoiceFinished { voice } => log::debug!("{} finished", voice),
            AudioEvent::StreamError { error } => log::error!("Stream error: {}", error),
        }
    }
}
