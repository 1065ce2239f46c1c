use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use log::{debug, warn};
use percent_encoding::percent_decode_str;

use crate::color::Color;
use crate::error::{SceneError, SceneResult};

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn split_image_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Percent-decoding, then Base64 with ASCII whitespace dropped, then UTF-8.
pub fn decode_image_list(encoded: &str) -> SceneResult<Vec<String>> {
    let unescaped = percent_decode_str(encoded)
        .decode_utf8()
        .map_err(|err| SceneError::ImageList(err.to_string()))?;
    let compact: String = unescaped.chars().filter(|ch| !ch.is_ascii_whitespace()).collect();
    let bytes = LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|err| SceneError::ImageList(err.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|err| SceneError::ImageList(err.to_string()))?;
    Ok(split_image_list(&text))
}

/// A query without `id` is an empty list, not an error.
pub fn image_list_from_query(query: &str) -> SceneResult<Vec<String>> {
    let query = query.trim_start_matches('?');
    let value = query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == "id")
        .map(|(_, value)| value);
    match value {
        Some(value) if !value.is_empty() => decode_image_list(value),
        _ => Ok(Vec::new()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub mean_color: Color,
}

impl LoadedImage {
    pub fn new(width: u32, height: u32, mean_color: Color) -> Self {
        Self {
            width,
            height,
            mean_color,
        }
    }
}

fn resolve_source(source: &str) -> SceneResult<PathBuf> {
    if let Some(rest) = source.strip_prefix("file://") {
        let path = percent_decode_str(rest)
            .decode_utf8()
            .map_err(|_| SceneError::UnsupportedSource(source.to_owned()))?;
        return Ok(PathBuf::from(path.as_ref()));
    }
    if source.contains("://") {
        return Err(SceneError::UnsupportedSource(source.to_owned()));
    }
    Ok(PathBuf::from(source))
}

pub fn load_image(source: &str) -> SceneResult<LoadedImage> {
    let path = resolve_source(source)?;
    let bytes = std::fs::read(&path)?;
    let image = image::load_from_memory(&bytes)?;
    let thumbnail = if image.width() > 32 || image.height() > 32 {
        image.thumbnail(32, 32).to_rgb8()
    } else {
        image.to_rgb8()
    };

    let mut sum = [0u64; 3];
    for pixel in thumbnail.pixels() {
        for (total, channel) in sum.iter_mut().zip(pixel.0) {
            *total += u64::from(channel);
        }
    }
    let count = u64::from(thumbnail.width()) * u64::from(thumbnail.height());
    let mean_color = if count == 0 {
        Color::WHITE
    } else {
        let channel = |total: u64| total as f32 / count as f32 / 255.0;
        Color::new(channel(sum[0]), channel(sum[1]), channel(sum[2]))
    };
    Ok(LoadedImage::new(image.width(), image.height(), mean_color))
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub group: usize,
    pub source: String,
    pub result: SceneResult<LoadedImage>,
}

/// No result is delivered after [`ImageLoader::shutdown`].
pub struct ImageLoader {
    cancel: Arc<AtomicBool>,
    sender: Sender<LoadOutcome>,
    receiver: Receiver<LoadOutcome>,
    pending: usize,
}

impl ImageLoader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            cancel: Arc::new(AtomicBool::new(false)),
            sender,
            receiver,
            pending: 0,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn spawn(&mut self, group: usize, source: String) -> SceneResult<()> {
        if self.is_cancelled() {
            return Ok(());
        }
        let cancel = Arc::clone(&self.cancel);
        let sender = self.sender.clone();
        thread::Builder::new()
            .name(format!("image-load-{group}"))
            .spawn(move || {
                if cancel.load(Ordering::Acquire) {
                    return;
                }
                let result = load_image(&source);
                if cancel.load(Ordering::Acquire) {
                    return;
                }
                let _ = sender.send(LoadOutcome {
                    group,
                    source,
                    result,
                });
            })?;
        self.pending += 1;
        Ok(())
    }

    pub fn drain(&mut self) -> Vec<LoadOutcome> {
        let mut finished = Vec::new();
        if self.is_cancelled() {
            return finished;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(outcome) => {
                    self.pending = self.pending.saturating_sub(1);
                    finished.push(outcome);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        finished
    }

    pub fn shutdown(&mut self) {
        if self.cancel.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = self.receiver.try_iter().count();
        debug!("image loader cancelled, {} pending, {} discarded", self.pending, dropped);
        if self.pending > dropped {
            warn!("{} image loads abandoned at shutdown", self.pending - dropped);
        }
        self.pending = 0;
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, Instant};
    use test_case::test_case;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(text)
    }

    #[test]
    fn decodes_a_padded_list() {
        let encoded = encode("a.png, b.png,,c.png ");
        assert_eq!(decode_image_list(&encoded).unwrap(), vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn accepts_percent_escaped_padding() {
        let encoded = encode("one.jpg").replace('=', "%3D");
        assert!(encoded.contains("%3D"));
        assert_eq!(decode_image_list(&encoded).unwrap(), vec!["one.jpg"]);
    }

    #[test]
    fn accepts_missing_padding() {
        let encoded = encode("one.jpg");
        let trimmed = encoded.trim_end_matches('=');
        assert_eq!(decode_image_list(trimmed).unwrap(), vec!["one.jpg"]);
    }

    #[test]
    fn keeps_unicode_entries() {
        let encoded = encode("ảnh một.png,写真.png");
        assert_eq!(decode_image_list(&encoded).unwrap(), vec!["ảnh một.png", "写真.png"]);
    }

    #[test_case("!!!not base64" ; "bad alphabet")]
    #[test_case("%ZZ%" ; "bad escape")]
    #[test_case("/w==" ; "invalid utf8")]
    fn malformed_input_is_an_error(input: &str) {
        assert!(matches!(decode_image_list(input), Err(SceneError::ImageList(_))));
    }

    #[test]
    fn query_extracts_the_id_parameter() {
        let query = format!("?lang=vi&id={}&x=1", encode("a.png,b.png"));
        assert_eq!(image_list_from_query(&query).unwrap(), vec!["a.png", "b.png"]);
        assert!(image_list_from_query("lang=vi").unwrap().is_empty());
        assert!(image_list_from_query("").unwrap().is_empty());
    }

    #[test]
    fn only_local_sources_are_supported() {
        assert!(matches!(
            load_image("https://example.com/a.png"),
            Err(SceneError::UnsupportedSource(_))
        ));
        assert_eq!(resolve_source("file:///tmp/a%20b.png").unwrap(), PathBuf::from("/tmp/a b.png"));
        assert_eq!(resolve_source("pics/a.png").unwrap(), PathBuf::from("pics/a.png"));
    }

    fn write_red_png(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{name}-{}.png", std::process::id()));
        image::RgbImage::from_pixel(6, 4, image::Rgb([255, 0, 0]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn loads_size_and_mean_colour() {
        let path = write_red_png("galaxy-scene-mean");
        let loaded = load_image(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!((loaded.width, loaded.height), (6, 4));
        assert_eq!(loaded.mean_color, Color::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_image("/definitely/not/here.png"),
            Err(SceneError::Io(_))
        ));
    }

    fn drain_until(loader: &mut ImageLoader, expected: usize) -> Vec<LoadOutcome> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut outcomes = Vec::new();
        while outcomes.len() < expected && Instant::now() < deadline {
            outcomes.extend(loader.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        outcomes
    }

    #[test]
    fn background_loads_arrive_between_frames() {
        let path = write_red_png("galaxy-scene-loader");
        let mut loader = ImageLoader::new();
        loader.spawn(0, path.to_string_lossy().into_owned()).unwrap();
        loader.spawn(1, "/definitely/not/here.png".to_owned()).unwrap();
        let mut outcomes = drain_until(&mut loader, 2);
        std::fs::remove_file(&path).ok();

        outcomes.sort_by_key(|outcome| outcome.group);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert_eq!(loader.pending(), 0);
    }

    #[test]
    fn nothing_is_delivered_after_shutdown() {
        let path = write_red_png("galaxy-scene-shutdown");
        let mut loader = ImageLoader::new();
        loader.spawn(0, path.to_string_lossy().into_owned()).unwrap();
        loader.shutdown();
        std::thread::sleep(Duration::from_millis(50));
        assert!(loader.drain().is_empty());
        loader.spawn(1, path.to_string_lossy().into_owned()).unwrap();
        assert_eq!(loader.pending(), 0);
        std::fs::remove_file(&path).ok();
    }
}
