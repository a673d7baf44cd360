//! Test fakes shared by the app-layer tests.

use std::io;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::{GameId, GameSelector, Metric, RawStat, TaskSpec};
use crate::impls::InMemoryTaskStore;
use crate::ports::{
    GameTarget, GenerateError, GenerateRequest, IdGenerator, StatGenerator, SystemClock,
    TaskStore, UlidGenerator,
};

pub fn fixture() -> (Arc<dyn TaskStore>, Arc<dyn IdGenerator>) {
    (
        Arc::new(InMemoryTaskStore::new()),
        Arc::new(UlidGenerator::new(SystemClock)),
    )
}

pub fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

/// One week of January 2024.
pub fn spec(game: GameSelector) -> TaskSpec {
    TaskSpec::new(
        "week one",
        game,
        date(1),
        date(7),
        vec![Metric::Kills, Metric::Deaths],
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: GameTarget,
    pub characters: Option<Vec<String>>,
}

/// Records every request and returns one row per day.
#[derive(Default)]
pub struct RecordingGenerator {
    calls: Mutex<Vec<Call>>,
}

impl RecordingGenerator {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl StatGenerator for RecordingGenerator {
    fn generate(&self, request: &GenerateRequest<'_>) -> Result<Vec<RawStat>, GenerateError> {
        self.calls.lock().unwrap().push(Call {
            target: request.target.clone(),
            characters: request.characters.map(<[String]>::to_vec),
        });

        let game = match &request.target {
            GameTarget::One(game) => game.clone(),
            GameTarget::All => GameId::new("valorant"),
        };
        let character = request
            .characters
            .and_then(|c| c.first().cloned())
            .unwrap_or_else(|| "Anon".to_string());
        Ok(request
            .start
            .iter_days()
            .take_while(|d| *d <= request.end)
            .map(|d| RawStat::new(game.clone(), Some(character.clone()), d, 10, 5, 3, 2))
            .collect())
    }
}

/// Returns the same rows on every call.
pub struct FixedGenerator(pub Vec<RawStat>);

impl StatGenerator for FixedGenerator {
    fn generate(&self, _request: &GenerateRequest<'_>) -> Result<Vec<RawStat>, GenerateError> {
        Ok(self.0.clone())
    }
}

pub struct FailingGenerator(pub String);

impl StatGenerator for FailingGenerator {
    fn generate(&self, _request: &GenerateRequest<'_>) -> Result<Vec<RawStat>, GenerateError> {
        Err(GenerateError::Failed(self.0.clone()))
    }
}

pub struct PanickingGenerator;

impl StatGenerator for PanickingGenerator {
    fn generate(&self, _request: &GenerateRequest<'_>) -> Result<Vec<RawStat>, GenerateError> {
        panic!("generator bug")
    }
}

/// `MakeWriter` that keeps formatted log lines in memory.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
