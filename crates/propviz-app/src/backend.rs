//! Physics backend access.
//!
//! [`Backend`] is the seam between the engine's request/reply data and
//! the network. [`HttpBackend`] talks to the real service with blocking
//! `reqwest` on the network worker thread; tests substitute an in-memory
//! implementation.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use propviz_core::enums::CoordinateMode;
use propviz_core::error::BackendError;
use propviz_core::results::{InterferenceResult, LosProfile, StatsOverview};
use propviz_core::types::{HeatPoint, Position, Scene};
use propviz_sim::{BackendReply, BackendRequest, HeatmapQuery, InterferenceQuery, ProfileQuery};

use crate::wire::{
    FilterPreset, GridSceneDto, HeatmapRequestDto, HeatmapResponseDto, InterferenceRequestDto,
    LosRequestDto, MoveDto, ScenarioDto,
};

pub trait Backend {
    fn fetch_scene(&self) -> Result<Scene, BackendError>;

    fn fetch_stats(&self) -> Result<StatsOverview, BackendError>;

    fn commit_move(&self, id: &str, position: Position) -> Result<(), BackendError>;

    fn fetch_heatmap(&self, query: &HeatmapQuery) -> Result<Vec<HeatPoint>, BackendError>;

    fn fetch_profile(&self, query: &ProfileQuery) -> Result<LosProfile, BackendError>;

    fn fetch_interference(&self, query: &InterferenceQuery) -> Result<InterferenceResult, BackendError>;
}

/// Answer one engine request. Never fails; failures travel inside the reply.
pub fn execute<B>(backend: &B, request: BackendRequest) -> BackendReply
where
    B: Backend + ?Sized,
{
    debug!(request = request.label(), "backend request");
    match request {
        BackendRequest::FetchScene => BackendReply::Scene(backend.fetch_scene()),
        BackendRequest::FetchStats => BackendReply::Stats(backend.fetch_stats()),
        BackendRequest::CommitMove {
            id,
            position,
            previous,
        } => {
            let result = backend.commit_move(&id, position);
            BackendReply::MoveCommitted {
                id,
                previous,
                result,
            }
        }
        BackendRequest::Heatmap(query) => BackendReply::Heatmap(backend.fetch_heatmap(&query)),
        BackendRequest::Profile(query) => BackendReply::Profile(backend.fetch_profile(&query)),
        BackendRequest::Interference(query) => BackendReply::Interference {
            result: backend.fetch_interference(&query),
            receiver_id: query.receiver.id,
        },
    }
}

// ---- HTTP ----

/// Connection settings for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// API root, e.g. `http://localhost:8000/api`.
    pub base_url: String,
    pub mode: CoordinateMode,
    /// Scenario fetched as the scene in map mode.
    pub scenario_id: String,
    pub filter: FilterPreset,
    pub timeout: Duration,
}

pub struct HttpBackend {
    client: Client,
    settings: HttpSettings,
}

impl HttpBackend {
    pub fn new(settings: HttpSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .map_err(|e| transport(path, e))?;
        decode(path, response)
    }

    fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, BackendError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .map_err(|e| transport(path, e))?;
        decode(path, response)
    }
}

fn transport(path: &str, err: reqwest::Error) -> BackendError {
    BackendError::Transport {
        path: path.to_string(),
        message: err.to_string(),
    }
}

fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Status {
            path: path.to_string(),
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        });
    }
    response.json::<T>().map_err(|e| BackendError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

impl Backend for HttpBackend {
    fn fetch_scene(&self) -> Result<Scene, BackendError> {
        match self.settings.mode {
            CoordinateMode::Grid => self.get::<GridSceneDto>("/scene").map(Scene::from),
            CoordinateMode::Map => {
                let path = format!("/scenario/{}", self.settings.scenario_id);
                self.get::<ScenarioDto>(&path).map(Scene::from)
            }
        }
    }

    fn fetch_stats(&self) -> Result<StatsOverview, BackendError> {
        self.get("/stats")
    }

    fn commit_move(&self, id: &str, position: Position) -> Result<(), BackendError> {
        self.post::<_, serde_json::Value>("/entity/move", &MoveDto::new(id, position))
            .map(|_| ())
    }

    fn fetch_heatmap(&self, query: &HeatmapQuery) -> Result<Vec<HeatPoint>, BackendError> {
        let body = HeatmapRequestDto::new(query, self.settings.filter);
        self.post::<_, HeatmapResponseDto>("/radio/heatmap", &body)
            .map(HeatmapResponseDto::into_points)
    }

    fn fetch_profile(&self, query: &ProfileQuery) -> Result<LosProfile, BackendError> {
        let path = "/radio/los";
        let body = LosRequestDto::new(query).map_err(|id| BackendError::Encode {
            path: path.to_string(),
            message: format!("entity '{id}' has no geographic position"),
        })?;
        self.post(path, &body)
    }

    fn fetch_interference(&self, query: &InterferenceQuery) -> Result<InterferenceResult, BackendError> {
        let path = "/radio/interference";
        let body = InterferenceRequestDto::new(query, self.settings.filter).map_err(|id| {
            BackendError::Encode {
                path: path.to_string(),
                message: format!("receiver '{id}' has no geographic position"),
            }
        })?;
        self.post(path, &body)
    }
}
