use std::{
    collections::{HashMap, VecDeque},
    io::Cursor,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use shared::{
    domain::{ImageMetadata, PhotoId},
    error::GameError,
};
use tokio::{net::TcpListener, sync::Notify};

use crate::{
    images::{parse_image_url, DecodedImage, ImageSource},
    unsplash::RandomImageSource,
};

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub(crate) fn decoded_image(url: &str, width: u32, height: u32) -> DecodedImage {
    let url = parse_image_url(url).expect("fixture url");
    DecodedImage::decode(url, &png_bytes(width, height)).expect("decode fixture")
}

pub(crate) fn metadata(id: &str, image_url: &str) -> ImageMetadata {
    ImageMetadata {
        id: PhotoId(id.to_string()),
        image_url: image_url.to_string(),
        description: None,
    }
}

pub(crate) async fn spawn_server(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// Polls `condition` until it holds or a generous deadline passes.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

pub(crate) struct MetadataStep {
    result: Result<ImageMetadata, GameError>,
    gate: Option<Arc<Notify>>,
}

impl MetadataStep {
    pub(crate) fn ok(id: &str, image_url: &str) -> Self {
        Self {
            result: Ok(metadata(id, image_url)),
            gate: None,
        }
    }

    pub(crate) fn err(error: GameError) -> Self {
        Self {
            result: Err(error),
            gate: None,
        }
    }

    pub(crate) fn gated(mut self, gate: &Arc<Notify>) -> Self {
        self.gate = Some(Arc::clone(gate));
        self
    }
}

/// Hands out scripted metadata in call order.
pub(crate) struct ScriptedMetadata {
    steps: Mutex<VecDeque<MetadataStep>>,
    calls: AtomicUsize,
}

impl ScriptedMetadata {
    pub(crate) fn new(steps: impl IntoIterator<Item = MetadataStep>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RandomImageSource for ScriptedMetadata {
    async fn fetch_random_image_metadata(&self) -> Result<ImageMetadata, GameError> {
        let step = self.steps.lock().expect("steps").pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(step) = step else {
            return Err(GameError::transport("metadata script exhausted"));
        };
        if let Some(gate) = step.gate {
            gate.notified().await;
        }
        step.result
    }
}

/// Serves decoded fixtures by url, optionally holding a url until its gate opens.
#[derive(Default)]
pub(crate) struct FixtureImages {
    sizes: HashMap<String, (u32, u32)>,
    gates: HashMap<String, Arc<Notify>>,
    calls: AtomicUsize,
}

impl FixtureImages {
    pub(crate) fn with_image(mut self, url: &str, width: u32, height: u32) -> Self {
        self.sizes.insert(url.to_string(), (width, height));
        self
    }

    pub(crate) fn with_gate(mut self, url: &str, gate: &Arc<Notify>) -> Self {
        self.gates.insert(url.to_string(), Arc::clone(gate));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for FixtureImages {
    async fn download_image(&self, url: &str) -> Result<DecodedImage, GameError> {
        let parsed = parse_image_url(url)?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.gates.get(url) {
            gate.notified().await;
        }
        let Some((width, height)) = self.sizes.get(url).copied() else {
            return Err(GameError::BadStatus(404));
        };
        DecodedImage::decode(parsed, &png_bytes(width, height))
    }
}
