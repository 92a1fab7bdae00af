// Saves/loads the whole project so a set survives a restart.
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::pipeline::project::ProjectState;

const ONDAS_DIR: &str = ".ondas";
const PROJECT_FILE: &str = "project.json";

// <project_dir>/.ondas/project.json
pub fn project_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(ONDAS_DIR).join(PROJECT_FILE)
}

// Missing file is not an error: Ok(None) and the caller starts fresh.
pub fn load_project(project_dir: &Path) -> anyhow::Result<Option<ProjectState>> {
    let path = project_file_path(project_dir);
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let state = serde_json::from_str(&data)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(state))
}

// Save the project state to disk, making the folder if it doesn't exist already
pub fn save_project(project_dir: &Path, state: &ProjectState) -> anyhow::Result<()> {
    let path = project_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .ondas/ if needed
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    log::info!("saved project to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::project::{InstrumentSource, ParamName, TrigKind};

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = ProjectState::default();
        state.tempo = 97.0;
        state.current_slot = 3;
        state.slots[3].length = 32;
        state.slots[3].tracks[2].steps[31].active = true;
        state.slots[3].tracks[2].steps[31]
            .param_locks
            .set(ParamName::Pitch, Some(-7));
        state.slots[3].tracks[2].steps[31].trig_condition.kind = TrigKind::Nth;
        state.routing[5].source = InstrumentSource::Radio;
        state.routing[5].muted = true;

        save_project(dir.path(), &state).unwrap();
        let loaded = load_project(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn missing_project_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_project(dir.path()).unwrap().is_none());
    }

    #[test]
    fn corrupt_project_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = project_file_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_project(dir.path()).is_err());
    }
}
