mod audio;
mod scheduler;
mod sse;
pub mod state_machine;

use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    catalog::{Catalog, CatalogError},
    config::AppConfig,
    quiz::QuizEngine,
};

pub use self::audio::{AudioDevice, AudioDevices, RemoteAudioPlayer};
pub use self::scheduler::Scheduler;
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

/// Engine driving the single quiz session of the server.
pub type SharedEngine = QuizEngine<RemoteAudioPlayer, StdRng>;

/// Central application state: the quiz engine and the connections observing it.
pub struct AppState {
    config: AppConfig,
    catalog: Arc<Catalog>,
    quiz: Mutex<SharedEngine>,
    sse: SseHub,
    audio_devices: Arc<AudioDevices>,
    scheduler: Scheduler,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, catalog: Catalog) -> SharedState {
        let catalog = Arc::new(catalog);
        let audio_devices = Arc::new(AudioDevices::new());
        let rng = match config.rng_seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let engine = QuizEngine::new(
            Arc::clone(&catalog),
            config.engine_settings(),
            RemoteAudioPlayer::new(Arc::clone(&audio_devices)),
            rng,
        );

        Arc::new(Self {
            config,
            catalog,
            quiz: Mutex::new(engine),
            sse: SseHub::new(32),
            audio_devices,
            scheduler: Scheduler::new(),
        })
    }

    /// Load the configured catalog, or the embedded one, and build the state around it.
    pub fn from_config(config: AppConfig) -> Result<SharedState, CatalogError> {
        let catalog = match config.catalog_path() {
            Some(path) => {
                info!(path = %path.display(), "loading catalog from disk");
                Catalog::from_path(path)?
            }
            None => Catalog::builtin()?,
        };
        let stats = catalog.stats();
        info!(
            entities = stats.entities,
            eligible = stats.eligible,
            shared_variants = stats.shared_variants,
            "catalog loaded"
        );
        Ok(Self::new(config, catalog))
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Reference data shared with the engine.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Quiz engine; every event is handled while holding this lock.
    pub fn quiz(&self) -> &Mutex<SharedEngine> {
        &self.quiz
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Registry of connected audio devices.
    pub fn audio_devices(&self) -> &Arc<AudioDevices> {
        &self.audio_devices
    }

    /// Pending deferred actions.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}
