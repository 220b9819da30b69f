// kubeintent-cli/src/history.rs

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::warn;
use uuid::Uuid;

use kubeintent_core::utils::preview_line;
use kubeintent_core::{AssistantReply, InteractionLog};

const PREVIEW_CHARS: usize = 70;

/// One query and, once handled, its reply.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InteractionRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub query: String,
    pub reply: Option<AssistantReply>,
}

impl InteractionRecord {
    pub fn new(query: impl Into<String>) -> Self {
        let now = Utc::now();
        InteractionRecord {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            query: query.into(),
            reply: None,
        }
    }

    /// Short preview of the query for listings.
    pub fn preview(&self) -> String {
        let preview = preview_line(&self.query, PREVIEW_CHARS);
        if preview.is_empty() {
            "[empty request]".to_string()
        } else {
            preview
        }
    }
}

/// Interaction log stored as one JSON file per interaction.
#[derive(Debug, Clone)]
pub struct FileInteractionLog {
    dir: PathBuf,
}

impl FileInteractionLog {
    /// Opens the log at `dir`, creating the directory if necessary.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create history directory at {:?}", dir))?;
        Ok(Self { dir })
    }

    /// `<data_dir>/kubeintent/history`.
    pub fn default_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .map(|d| d.join("kubeintent").join("history"))
            .ok_or_else(|| anyhow!("Could not determine data directory for interaction history"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn save(&self, record: &InteractionRecord) -> Result<()> {
        let file_path = self.record_path(record.id);
        let file = File::create(&file_path)
            .with_context(|| format!("Failed to create history file at {:?}", file_path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, record)
            .with_context(|| format!("Failed to serialize history to {:?}", file_path))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush writer for {:?}", file_path))?;
        Ok(())
    }

    pub fn load(&self, id: Uuid) -> Result<InteractionRecord> {
        let file_path = self.record_path(id);
        if !file_path.exists() {
            return Err(anyhow!("No interaction recorded with ID {}", id));
        }
        let file = File::open(&file_path)
            .with_context(|| format!("Failed to open history file at {:?}", file_path))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to deserialize history from {:?}", file_path))
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        let file_path = self.record_path(id);
        if !file_path.exists() {
            return Err(anyhow!("No interaction recorded with ID {}", id));
        }
        fs::remove_file(&file_path)
            .with_context(|| format!("Failed to delete history file at {:?}", file_path))
    }

    /// All readable records, most recently updated first. Unreadable files
    /// are skipped with a warning.
    pub fn list(&self) -> Result<Vec<InteractionRecord>> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read history directory at {:?}", self.dir))?
        {
            let path = entry?.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            else {
                continue;
            };
            match self.load(id) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable history file")
                }
            }
        }
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }
}

impl InteractionLog for FileInteractionLog {
    fn record_query(&self, query: &str) -> Result<Uuid> {
        let record = InteractionRecord::new(query);
        self.save(&record)?;
        Ok(record.id)
    }

    fn record_result(&self, id: Uuid, reply: &AssistantReply) -> Result<()> {
        let mut record = self.load(id)?;
        record.reply = Some(reply.clone());
        record.updated_at = Utc::now();
        self.save(&record)
    }
}
