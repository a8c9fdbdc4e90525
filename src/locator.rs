//! Finds the occupancy simulator's CSV output. A path supplied by the caller wins; otherwise
//! the file is looked for where each way of running the measure leaves it.

use crate::errors::MelsError;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub trait FileProbe {
    fn is_file(&self, path: &Path) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FsProbe;

impl FileProbe for FsProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// One conventional location the occupancy file may have been written to.
pub trait CandidatePathProvider: Debug {
    fn candidate(&self, file_name: &str) -> PathBuf;

    /// Short name of the run mode this location belongs to, used in logs.
    fn label(&self) -> &'static str;
}

fn relative_to(base: &Path, segments: &[&str], file_name: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    path.push(file_name);
    path
}

/// `<measure_dir>/../../files`, used when run from the command line with a workflow file.
#[derive(Clone, Debug)]
pub struct MeasureFilesDir {
    pub measure_dir: PathBuf,
}

impl CandidatePathProvider for MeasureFilesDir {
    fn candidate(&self, file_name: &str) -> PathBuf {
        relative_to(&self.measure_dir, &["..", "..", "files"], file_name)
    }

    fn label(&self) -> &'static str {
        "workflow"
    }
}

/// `<run_dir>/../../files`, used when run from the command line directly.
#[derive(Clone, Debug)]
pub struct RunDirFiles {
    pub run_dir: PathBuf,
}

impl CandidatePathProvider for RunDirFiles {
    fn candidate(&self, file_name: &str) -> PathBuf {
        relative_to(&self.run_dir, &["..", "..", "files"], file_name)
    }

    fn label(&self) -> &'static str {
        "command line"
    }
}

/// `<run_dir>/../../../resources/files`, where the desktop application keeps it.
#[derive(Clone, Debug)]
pub struct GuiResourcesFiles {
    pub run_dir: PathBuf,
}

impl CandidatePathProvider for GuiResourcesFiles {
    fn candidate(&self, file_name: &str) -> PathBuf {
        relative_to(
            &self.run_dir,
            &["..", "..", "..", "resources", "files"],
            file_name,
        )
    }

    fn label(&self) -> &'static str {
        "application"
    }
}

/// `<run_dir>/../generated_files`, where test runs generate it.
#[derive(Clone, Debug)]
pub struct GeneratedFiles {
    pub run_dir: PathBuf,
}

impl CandidatePathProvider for GeneratedFiles {
    fn candidate(&self, file_name: &str) -> PathBuf {
        relative_to(&self.run_dir, &["..", "generated_files"], file_name)
    }

    fn label(&self) -> &'static str {
        "test"
    }
}

#[derive(Debug)]
pub struct OccupancySourceLocator<P: FileProbe = FsProbe> {
    file_name: String,
    providers: Vec<Box<dyn CandidatePathProvider>>,
    probe: P,
}

impl OccupancySourceLocator<FsProbe> {
    /// Locator probing the real file system in the conventional order. The measure
    /// directory is only probed when known.
    pub fn for_run(measure_dir: Option<&Path>, run_dir: &Path, file_name: &str) -> Self {
        Self::with_probe(file_name, default_providers(measure_dir, run_dir), FsProbe)
    }
}

pub fn default_providers(
    measure_dir: Option<&Path>,
    run_dir: &Path,
) -> Vec<Box<dyn CandidatePathProvider>> {
    let mut providers: Vec<Box<dyn CandidatePathProvider>> = vec![];
    if let Some(measure_dir) = measure_dir {
        providers.push(Box::new(MeasureFilesDir {
            measure_dir: measure_dir.to_path_buf(),
        }));
    }
    providers.push(Box::new(RunDirFiles {
        run_dir: run_dir.to_path_buf(),
    }));
    providers.push(Box::new(GuiResourcesFiles {
        run_dir: run_dir.to_path_buf(),
    }));
    providers.push(Box::new(GeneratedFiles {
        run_dir: run_dir.to_path_buf(),
    }));
    providers
}

impl<P: FileProbe> OccupancySourceLocator<P> {
    pub fn with_probe(
        file_name: &str,
        providers: Vec<Box<dyn CandidatePathProvider>>,
        probe: P,
    ) -> Self {
        Self {
            file_name: file_name.to_string(),
            providers,
            probe,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn locate(&self, override_path: Option<&Path>) -> Result<PathBuf, MelsError> {
        let mut probed = vec![];

        if let Some(path) = override_path.filter(|path| !path.as_os_str().is_empty()) {
            if self.probe.is_file(path) {
                info!(
                    "Use user-provided occupancy schedule file at: {}",
                    path.display()
                );
                return Ok(path.to_path_buf());
            }
            warn!(
                "User-provided occupancy schedule file {} does not exist, looking in default locations",
                path.display()
            );
            probed.push(path.to_path_buf());
        }

        for provider in &self.providers {
            let candidate = provider.candidate(&self.file_name);
            info!(
                "Looking for occupancy schedule file ({} run) at: {}",
                provider.label(),
                candidate.display()
            );
            if self.probe.is_file(&candidate) {
                info!("Use default occupancy schedule file at: {}", candidate.display());
                return Ok(candidate);
            }
            probed.push(candidate);
        }

        Err(MelsError::SourceNotFound { probed })
    }
}
