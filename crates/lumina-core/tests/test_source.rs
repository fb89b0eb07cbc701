mod common;

use std::collections::VecDeque;
use std::fs;

use lumina_core::error::{LuminaError, Result};
use lumina_core::frame::{PartialFrame, Payload};
use lumina_core::io::save_frame;
use lumina_core::source::{FrameSource, ImageSequenceSource, SourceHub, Translation};
use tempfile::TempDir;

use common::image;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Source that plays back a fixed list of fetch results, then ends.
struct ScriptedSource {
    name: String,
    script: VecDeque<Result<Option<PartialFrame>>>,
    fail_connect: bool,
}

impl ScriptedSource {
    fn new(name: &str, script: Vec<Result<Option<PartialFrame>>>) -> Self {
        Self {
            name: name.to_string(),
            script: script.into(),
            fail_connect: false,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self) -> Result<()> {
        if self.fail_connect {
            return Err(LuminaError::Source("no camera".into()));
        }
        Ok(())
    }

    fn fetch(&mut self) -> Result<Option<PartialFrame>> {
        self.script.pop_front().unwrap_or(Ok(None))
    }

    fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

/// Source that never has anything to deliver.
struct SilentSource;

impl FrameSource for SilentSource {
    fn name(&self) -> &str {
        "silent"
    }

    fn fetch(&mut self) -> Result<Option<PartialFrame>> {
        Ok(None)
    }
}

fn boxed(source: impl FrameSource + 'static) -> Box<dyn FrameSource> {
    Box::new(source)
}

fn frame_named(name: &str) -> PartialFrame {
    PartialFrame::new(name, image(2, 2, |x, y| (x + y) as u16))
}

fn error_text(partial: &PartialFrame) -> String {
    match &partial.payload {
        Some(Payload::Message(text)) => text.clone(),
        other => panic!("expected an error message, got {other:?}"),
    }
}

fn write_images(dir: &TempDir, names: &[&str]) {
    for (i, name) in names.iter().enumerate() {
        let frame = image(3, 2, |x, y| (i * 10 + x + y) as u8);
        save_frame(&frame, (0.0, 255.0), &dir.path().join(name)).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Translation
// ---------------------------------------------------------------------------

#[test]
fn test_translation_parse() {
    assert_eq!("3,4".parse::<Translation>().unwrap(), Translation::new(3, 4));
    assert_eq!(
        " 3 , ".parse::<Translation>().unwrap(),
        Translation { x: Some(3), y: None }
    );
    assert_eq!(",7".parse::<Translation>().unwrap(), Translation { x: None, y: Some(7) });
    assert_eq!("left".parse::<Translation>().unwrap(), Translation::default());
    assert!("1,2,3".parse::<Translation>().is_err());
}

#[test]
fn test_translation_display() {
    assert_eq!(Translation::new(12, 0).to_string(), "12,0");
    assert_eq!(Translation::default().to_string(), ",");
}

// ---------------------------------------------------------------------------
// SourceHub
// ---------------------------------------------------------------------------

#[test]
fn test_hub_rejects_bad_refresh_rate() {
    assert!(matches!(SourceHub::start(vec![], 0.0), Err(LuminaError::InvalidConfig(_))));
    assert!(matches!(SourceHub::start(vec![], f64::NAN), Err(LuminaError::InvalidConfig(_))));
}

#[test]
fn test_hub_applies_translation_and_finishes() {
    let source = ScriptedSource::new("left", vec![Ok(Some(frame_named("a")))]);
    let translation = Translation { x: Some(5), y: None };
    let mut hub = SourceHub::start(vec![(boxed(source), translation)], 1.0).unwrap();

    assert_eq!(hub.len(), 1);
    assert_eq!(hub.names(), vec!["left"]);

    let tick = hub.collect_tick();
    assert_eq!(tick.len(), 1);
    assert_eq!(tick[0].name.as_deref(), Some("a"));
    assert_eq!(tick[0].x_offset, Some(5));
    assert_eq!(tick[0].y_offset, None);
    assert!(!hub.is_finished());

    let tick = hub.collect_tick();
    assert_eq!(tick[0], PartialFrame::default());
    assert!(hub.is_finished());
}

#[test]
fn test_hub_keeps_source_order() {
    let first = ScriptedSource::new("first", vec![Ok(Some(frame_named("one")))]);
    let second = ScriptedSource::new("second", vec![Ok(Some(frame_named("two")))]);
    let mut hub = SourceHub::start(
        vec![
            (boxed(first), Translation::new(0, 0)),
            (boxed(second), Translation::new(2, 0)),
        ],
        1.0,
    )
    .unwrap();

    let tick = hub.collect_tick();
    let names: Vec<_> = tick.iter().map(|p| p.name.as_deref()).collect();
    assert_eq!(names, vec![Some("one"), Some("two")]);
    assert_eq!(tick[1].x_offset, Some(2));
}

#[test]
fn test_hub_silent_source_gives_empty_entry() {
    let mut hub = SourceHub::start(vec![(boxed(SilentSource), Translation::default())], 0.05).unwrap();

    let tick = hub.collect_tick();
    assert_eq!(tick, vec![PartialFrame::default()]);
    assert!(!hub.is_finished());

    hub.shutdown();
}

#[test]
fn test_hub_reports_fetch_errors() {
    let source = ScriptedSource::new("flaky", vec![Err(LuminaError::Source("timeout".into()))]);
    let mut hub = SourceHub::start(vec![(boxed(source), Translation::default())], 1.0).unwrap();

    let tick = hub.collect_tick();
    assert!(tick[0].is_error());
    assert_eq!(error_text(&tick[0]), "Source error: timeout");
}

#[test]
fn test_hub_reports_connect_errors() {
    let mut source = ScriptedSource::new("camera", vec![Ok(Some(frame_named("never")))]);
    source.fail_connect = true;
    let mut hub = SourceHub::start(vec![(boxed(source), Translation::default())], 1.0).unwrap();

    let tick = hub.collect_tick();
    assert!(tick[0].is_error());
    assert_eq!(error_text(&tick[0]), "Source error: no camera");

    hub.collect_tick();
    assert!(hub.is_finished());
}

// ---------------------------------------------------------------------------
// ImageSequenceSource
// ---------------------------------------------------------------------------

#[test]
fn test_sequence_from_dir() {
    let dir = TempDir::new().unwrap();
    write_images(&dir, &["b.png", "a.png"]);
    fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

    let mut source = ImageSequenceSource::from_dir(dir.path(), false).unwrap();
    assert_eq!(source.len(), 2);

    let first = source.fetch().unwrap().unwrap();
    assert_eq!(first.name.as_deref(), Some("a.png"));
    assert_eq!(first.pixels().unwrap().shape(), &[3, 2]);
    assert_eq!(source.fetch().unwrap().unwrap().name.as_deref(), Some("b.png"));
    assert!(source.is_exhausted());
    assert!(source.fetch().unwrap().is_none());
}

#[test]
fn test_sequence_loops() {
    let dir = TempDir::new().unwrap();
    write_images(&dir, &["a.png", "b.png"]);

    let mut source = ImageSequenceSource::from_dir(dir.path(), true).unwrap();
    let names: Vec<_> = (0..5)
        .map(|_| source.fetch().unwrap().unwrap().name.unwrap())
        .collect();

    assert_eq!(names, vec!["a.png", "b.png", "a.png", "b.png", "a.png"]);
    assert!(!source.is_exhausted());
}

#[test]
fn test_sequence_empty_dir() {
    let dir = TempDir::new().unwrap();
    let result = ImageSequenceSource::from_dir(dir.path(), false);
    assert!(matches!(result, Err(LuminaError::Source(_))));
}

#[test]
fn test_sequence_through_hub() {
    let dir = TempDir::new().unwrap();
    write_images(&dir, &["a.png", "b.png"]);
    let source = ImageSequenceSource::from_dir(dir.path(), false).unwrap();
    let mut hub = SourceHub::start(vec![(boxed(source), Translation::default())], 1.0).unwrap();

    let mut names = Vec::new();
    while !hub.is_finished() {
        for partial in hub.collect_tick() {
            names.extend(partial.name);
        }
    }

    assert_eq!(names, vec!["a.png", "b.png"]);
}
