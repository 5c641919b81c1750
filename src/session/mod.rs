//! Application shell logic: commands, background jobs, and user feedback.
//!
//! [`Session`] owns the scene registry, the viewport, and the background
//! [`Worker`]. UI surfaces (keys, panel buttons, dropped files, the CLI)
//! translate user intent into [`Command`]s; [`Session::poll`] applies
//! finished jobs once per frame. Every error is recovered here: it is logged,
//! queued as a [`Notice`], and flashed on the status line.

mod status;
/// Background job thread.
pub mod worker;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

pub use status::{Notice, PanelState, StatusLine, STATUS_TIMEOUT};
use worker::{CancelToken, Job, JobId, JobOutput, JobResult, LoadSource, Worker};

use crate::error::{BiovisError, Precondition};
use crate::geometry::TriMesh;
use crate::loader::{self, LoadedStructure};
use crate::options::Options;
use crate::scene::{ModelId, SceneRegistry, StructureModel, SurfaceAttachment};
use crate::structure::fetch;
use crate::viewport::{RepresentationStyle, Viewport, VisualHandle};

/// A user-triggered action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a structure file.
    Open(PathBuf),
    /// Download and load a PDB entry by identifier.
    Fetch(String),
    /// Generate the surface of the selected structure.
    GenerateSurface,
    /// Write the selected structure's surface to a file.
    ExportSurface(PathBuf),
    /// Select a structure by name; `None` clears the selection.
    Select(Option<String>),
    /// Select the next structure in list order.
    SelectNext,
    /// Delete the selected structure and its representations.
    DeleteSelected,
    /// Cancel all pending background jobs.
    Cancel,
    /// Frame everything in view.
    ResetCamera,
}

#[derive(Debug)]
struct PendingJob {
    label: String,
    cancel: CancelToken,
}

/// Interaction-thread state of one application window.
pub struct Session {
    options: Options,
    registry: SceneRegistry,
    viewport: Viewport,
    worker: Worker,
    pending: FxHashMap<JobId, PendingJob>,
    next_job: u64,
    notices: Vec<Notice>,
    status: StatusLine,
}

impl Session {
    /// Create a session with an empty scene and a running worker.
    ///
    /// # Errors
    ///
    /// [`BiovisError::ThreadSpawn`] if the worker thread cannot start.
    pub fn new(options: Options, width: u32, height: u32) -> Result<Self, BiovisError> {
        let viewport = Viewport::new(&options.camera, width, height);
        Ok(Self {
            options,
            registry: SceneRegistry::new(),
            viewport,
            worker: Worker::spawn()?,
            pending: FxHashMap::default(),
            next_job: 0,
            notices: Vec::new(),
            status: StatusLine::default(),
        })
    }

    /// Runtime options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Loaded structures.
    #[must_use]
    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    /// Render-scene state.
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Mutable render-scene state (camera and drags).
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Representations of the selected structure, targets of transform drags.
    #[must_use]
    pub fn selected_handles(&self) -> Vec<VisualHandle> {
        self.registry
            .selected()
            .map(StructureModel::handles)
            .unwrap_or_default()
    }

    /// Current status line text.
    #[must_use]
    pub fn status(&self) -> &str {
        self.status.text()
    }

    /// `true` while background jobs are pending.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Modal warnings queued since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Suggested export file name for the selected structure.
    #[must_use]
    pub fn default_export_name(&self) -> Option<String> {
        self.registry
            .selected()
            .map(|m| format!("{}_surface.stl", m.name))
    }

    /// Check that the selection has a surface to export before asking the
    /// user for a destination. Failures are reported like [`execute`](Self::execute).
    ///
    /// # Errors
    ///
    /// [`Precondition::NoSelection`] or [`Precondition::NoSurface`].
    pub fn ensure_exportable(&mut self) -> Result<(), BiovisError> {
        let result = self.export_target().map(|_| ());
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// Snapshot for the side panel.
    #[must_use]
    pub fn panel_state(&self) -> PanelState {
        let selected = self.registry.selected();
        PanelState {
            structures: self.registry.names().map(str::to_owned).collect(),
            selected: selected.map(|m| m.name.clone()),
            has_surface: selected.is_some_and(|m| m.surface().is_some()),
            status: self.status().to_owned(),
            busy: self.is_busy(),
        }
    }

    /// Run a command. Failures are reported (log, notice, status line) and
    /// also returned.
    ///
    /// # Errors
    ///
    /// Any [`BiovisError`] raised synchronously, e.g. unmet preconditions or
    /// a malformed PDB identifier.
    pub fn execute(&mut self, command: Command) -> Result<(), BiovisError> {
        log::debug!("session: {command:?}");
        let result = self.dispatch(command);
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    fn dispatch(&mut self, command: Command) -> Result<(), BiovisError> {
        match command {
            Command::Open(path) => {
                let label = loader::display_name_for(&path);
                self.status.set(format!("Loading {label}..."));
                let job = self.load_job(LoadSource::File(path));
                self.submit(label, job);
            }
            Command::Fetch(id) => {
                let id = fetch::normalize_pdb_id(&id)?;
                self.status.set(format!("Downloading PDB ID: {id}..."));
                let job = self.load_job(LoadSource::Remote(id.clone()));
                self.submit(id, job);
            }
            Command::GenerateSurface => {
                let model = self
                    .registry
                    .selected()
                    .ok_or(BiovisError::Precondition(Precondition::NoSelection))?;
                if model.point_mesh.is_empty() {
                    return Err(BiovisError::Precondition(Precondition::EmptyPointMesh));
                }
                let job = Job::Surface {
                    model: model.id(),
                    points: Arc::clone(&model.point_mesh),
                };
                let label = format!("surface of {}", model.name);
                self.status.set("Generating surface...");
                self.submit(label, job);
            }
            Command::ExportSurface(path) => {
                let (model, surface) = self.export_target()?;
                let label = format!("export of {}", model.name);
                let job = Job::Export {
                    mesh: Arc::clone(&surface.mesh),
                    path: path.clone(),
                    format: self.options.export.format,
                };
                self.status.set(format!("Exporting to {}...", path.display()));
                self.submit(label, job);
            }
            Command::Select(name) => {
                let _ = self.registry.select(name.as_deref());
            }
            Command::SelectNext => {
                if let Some(model) = self.registry.select_next() {
                    let name = model.name.clone();
                    self.status.flash(format!("Selected {name}"));
                }
            }
            Command::DeleteSelected => {
                let Some(name) = self.registry.selected().map(|m| m.name.clone()) else {
                    return Ok(());
                };
                if self.registry.remove(&name, &mut self.viewport).is_some() {
                    log::info!("deleted {name}");
                    self.status.flash(format!("Deleted {name}"));
                }
            }
            Command::Cancel => self.cancel_all(),
            Command::ResetCamera => self.viewport.reset_camera(),
        }
        Ok(())
    }

    fn export_target(&self) -> Result<(&StructureModel, &SurfaceAttachment), BiovisError> {
        let model = self
            .registry
            .selected()
            .ok_or(BiovisError::Precondition(Precondition::NoSelection))?;
        let surface = model
            .surface()
            .ok_or(BiovisError::Precondition(Precondition::NoSurface))?;
        Ok((model, surface))
    }

    fn load_job(&self, source: LoadSource) -> Job {
        Job::Load {
            source,
            geometry: self.options.geometry.clone(),
            fetch: self.options.fetch.clone(),
        }
    }

    fn submit(&mut self, label: String, job: Job) {
        let id = JobId(self.next_job);
        self.next_job += 1;
        let cancel = CancelToken::new();
        log::debug!("session: job {} queued ({label})", id.0);
        let _ = self.pending.insert(
            id,
            PendingJob {
                label,
                cancel: cancel.clone(),
            },
        );
        self.worker.submit(id, cancel, job);
    }

    fn cancel_all(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        for (id, job) in self.pending.drain() {
            log::info!("cancelled job {} ({})", id.0, job.label);
            job.cancel.cancel();
        }
        self.status.flash("Cancelled");
    }

    /// Apply every finished background job. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(result) = self.worker.try_recv() {
            applied += usize::from(self.apply(result));
        }
        applied
    }

    /// Block until no jobs are pending or `timeout` elapses, applying
    /// results as they arrive. Returns `true` if the session became idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.is_busy() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if let Some(result) = self.worker.recv_timeout(remaining) {
                let _ = self.apply(result);
            }
        }
        let _ = self.poll();
        true
    }

    fn apply(&mut self, result: JobResult) -> bool {
        let Some(job) = self.pending.remove(&result.id) else {
            log::debug!("session: dropping result of cancelled job {}", result.id.0);
            return false;
        };
        match result.outcome {
            Ok(JobOutput::Loaded(loaded)) => self.register(loaded),
            Ok(JobOutput::Surface { model, mesh }) => self.attach_surface(model, mesh),
            Ok(JobOutput::Exported { path, triangles }) => {
                self.status
                    .flash(format!("Surface exported to {}", path.display()));
                log::info!("exported {triangles} triangles to {}", path.display());
            }
            Err(e) => {
                log::debug!("session: job {} ({}) failed", result.id.0, job.label);
                self.report(&e);
            }
        }
        true
    }

    fn register(&mut self, loaded: LoadedStructure) {
        let name = self.registry.unique_name(&loaded.name);
        let handle = self.viewport.add_spheres(
            Arc::clone(&loaded.point_mesh),
            RepresentationStyle::Solid {
                color: self.options.display.atom_color,
            },
        );
        let atoms = loaded.atom_positions.len();
        let model = StructureModel::new(
            name.clone(),
            loaded.source,
            loaded.atom_positions,
            loaded.point_mesh,
            handle,
        );
        if let Err(e) = self.registry.add(model) {
            let _ = self.viewport.remove_representation(handle);
            self.report(&e);
            return;
        }
        let _ = self.viewport.attach_interactive_transform(handle);
        self.viewport.reset_camera();
        log::info!("loaded {name} ({atoms} atoms)");
        self.status.flash(format!("Successfully loaded {name}"));
    }

    fn attach_surface(&mut self, id: ModelId, mesh: TriMesh) {
        let Some(model) = self.registry.get_by_id_mut(id) else {
            log::debug!("session: model {} is gone, discarding surface", id.raw());
            return;
        };
        let display = &self.options.display;
        let mesh = Arc::new(mesh);
        let handle = self.viewport.add_representation(
            Arc::clone(&mesh),
            RepresentationStyle::Translucent {
                color: display.surface_color,
                opacity: display.surface_opacity,
            },
        );
        // The surface follows any transform already applied to the atoms.
        if let Some(transform) = self.viewport.transform(model.visual_handle) {
            let _ = self.viewport.set_transform(handle, transform);
        }
        let _ = self.viewport.attach_interactive_transform(handle);
        if let Some(old) = model.replace_surface(SurfaceAttachment { mesh, handle }) {
            let _ = self.viewport.remove_representation(old.handle);
        }
        log::info!(
            "surface for {}: {} triangles",
            model.name,
            model.surface().map_or(0, |s| s.mesh.triangle_count())
        );
        self.status.flash("Surface generated.");
    }

    fn report(&mut self, error: &BiovisError) {
        if matches!(error, BiovisError::Cancelled) {
            self.status.flash("Cancelled");
            return;
        }
        log::warn!("{}: {error}", error.title());
        self.status.flash(format!("{}: {error}", error.title()));
        if error.is_modal() {
            self.notices.push(Notice {
                title: error.title().to_owned(),
                message: error.to_string(),
            });
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for (id, job) in self.pending.drain() {
            log::debug!("session: dropping job {} ({})", id.0, job.label);
            job.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::stl;
    use crate::options::GeometryOptions;
    use crate::structure::test_support::{three_atoms, write_pdb};

    const WAIT: Duration = Duration::from_secs(60);

    fn session() -> Session {
        Session::new(Options::default(), 800, 600).unwrap()
    }

    fn loaded_session(dir: &std::path::Path) -> Session {
        let mut s = session();
        let path = write_pdb(dir, "triad", &three_atoms());
        s.execute(Command::Open(path)).unwrap();
        assert!(s.wait_idle(WAIT));
        s
    }

    fn surface_handles(s: &Session) -> usize {
        s.viewport()
            .representations()
            .filter(|(_, r)| r.style.is_translucent())
            .count()
    }

    #[test]
    fn dropping_the_session_does_not_wait_for_queued_fetches() {
        // Accepts connections but never answers, so each fetch hangs until
        // its timeout.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut options = Options::default();
        options.fetch.base_url = format!("http://{}", listener.local_addr().unwrap());
        options.fetch.cache_dir = dir.path().join("cache");
        options.fetch.timeout_secs = 2;
        let mut s = Session::new(options, 800, 600).unwrap();
        for id in ["1ABC", "2ABC", "3ABC"] {
            s.execute(Command::Fetch(id.into())).unwrap();
        }
        assert!(s.is_busy());

        let started = std::time::Instant::now();
        drop(s);
        // At most the fetch already in flight runs to its timeout.
        assert!(started.elapsed() < Duration::from_millis(3500), "{:?}", started.elapsed());
        drop(listener);
    }

    #[test]
    fn open_registers_and_selects() {
        let dir = tempfile::tempdir().unwrap();
        let s = loaded_session(dir.path());
        assert_eq!(s.registry().names().collect::<Vec<_>>(), ["triad"]);
        let model = s.registry().selected().unwrap();
        assert_eq!(model.point_mesh.len(), 3);
        assert_eq!(s.viewport().len(), 1);
        assert!(s.viewport().get(model.visual_handle).unwrap().interactive);
        assert_eq!(s.status(), "Successfully loaded triad");
    }

    #[test]
    fn opening_twice_suffixes_the_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = loaded_session(dir.path());
        s.execute(Command::Open(dir.path().join("triad.pdb"))).unwrap();
        assert!(s.wait_idle(WAIT));
        assert_eq!(
            s.registry().names().collect::<Vec<_>>(),
            ["triad", "triad (2)"]
        );
    }

    #[test]
    fn deleting_leaves_no_representations() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = loaded_session(dir.path());
        s.execute(Command::GenerateSurface).unwrap();
        assert!(s.wait_idle(WAIT));
        assert_eq!(s.viewport().len(), 2);

        s.execute(Command::DeleteSelected).unwrap();
        assert!(s.registry().is_empty());
        assert!(s.viewport().is_empty());
        // Nothing selected: deleting again is a quiet no-op.
        s.execute(Command::DeleteSelected).unwrap();
    }

    #[test]
    fn regenerating_keeps_one_surface() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = loaded_session(dir.path());
        s.execute(Command::GenerateSurface).unwrap();
        assert!(s.wait_idle(WAIT));
        let first = s.registry().selected().unwrap().surface().unwrap().handle;
        s.execute(Command::GenerateSurface).unwrap();
        assert!(s.wait_idle(WAIT));

        assert_eq!(surface_handles(&s), 1);
        let second = s.registry().selected().unwrap().surface().unwrap().handle;
        assert_ne!(first, second);
        assert!(!s.viewport().contains(first));
        assert_eq!(s.status(), "Surface generated.");
    }

    #[test]
    fn export_check_runs_before_the_save_dialog() {
        let mut s = session();
        assert!(matches!(
            s.ensure_exportable(),
            Err(BiovisError::Precondition(Precondition::NoSelection))
        ));
        assert_eq!(s.take_notices()[0].title, "No Selection");

        let dir = tempfile::tempdir().unwrap();
        let mut s = loaded_session(dir.path());
        assert!(s.ensure_exportable().is_err());
        s.execute(Command::GenerateSurface).unwrap();
        assert!(s.wait_idle(WAIT));
        assert!(s.ensure_exportable().is_ok());
    }

    #[test]
    fn export_without_surface_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = loaded_session(dir.path());
        let target = dir.path().join("out.stl");
        assert!(matches!(
            s.execute(Command::ExportSurface(target.clone())),
            Err(BiovisError::Precondition(Precondition::NoSurface))
        ));
        assert!(s.wait_idle(WAIT));
        assert!(!target.exists());
        let notices = s.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "No Surface");
    }

    #[test]
    fn commands_without_selection_are_rejected() {
        let mut s = session();
        assert!(matches!(
            s.execute(Command::GenerateSurface),
            Err(BiovisError::Precondition(Precondition::NoSelection))
        ));
        assert!(matches!(
            s.execute(Command::ExportSurface(PathBuf::from("x.stl"))),
            Err(BiovisError::Precondition(Precondition::NoSelection))
        ));
        assert_eq!(s.take_notices()[0].title, "No Selection");
        assert!(s.take_notices().is_empty());
    }

    #[test]
    fn export_writes_the_surface() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = loaded_session(dir.path());
        assert_eq!(s.default_export_name().as_deref(), Some("triad_surface.stl"));
        s.execute(Command::GenerateSurface).unwrap();
        assert!(s.wait_idle(WAIT));

        let target = dir.path().join("triad_surface.stl");
        s.execute(Command::ExportSurface(target.clone())).unwrap();
        assert!(s.wait_idle(WAIT));
        let written = stl::read_stl(&target).unwrap();
        let surface = &s.registry().selected().unwrap().surface().unwrap().mesh;
        assert_eq!(written.triangle_count(), surface.triangle_count());
        assert_eq!(written.vertex_count(), surface.vertex_count());
    }

    #[test]
    fn unparseable_file_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme.pdb");
        std::fs::write(&path, "hello\nworld\n").unwrap();
        let mut s = session();
        s.execute(Command::Open(path)).unwrap();
        assert!(s.wait_idle(WAIT));
        assert!(s.registry().is_empty());
        assert!(s.viewport().is_empty());
        assert_eq!(s.take_notices()[0].title, "File Error");
    }

    #[test]
    fn zero_radius_surface_fails_and_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = Options::default();
        options.geometry = GeometryOptions {
            atom_radius: 0.0,
            ..GeometryOptions::default()
        };
        let mut s = Session::new(options, 800, 600).unwrap();
        s.execute(Command::Open(write_pdb(dir.path(), "flat", &three_atoms())))
            .unwrap();
        assert!(s.wait_idle(WAIT));
        s.execute(Command::GenerateSurface).unwrap();
        assert!(s.wait_idle(WAIT));
        assert!(s.registry().selected().unwrap().surface().is_none());
        assert_eq!(s.viewport().len(), 1);
        assert_eq!(s.take_notices()[0].title, "Surface Error");
    }

    #[test]
    fn surface_for_deleted_model_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = loaded_session(dir.path());
        s.execute(Command::GenerateSurface).unwrap();
        s.execute(Command::DeleteSelected).unwrap();
        assert!(s.wait_idle(WAIT));
        assert!(s.viewport().is_empty());
        assert!(s.take_notices().is_empty());
    }

    #[test]
    fn cancel_drops_pending_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session();
        s.execute(Command::Open(write_pdb(dir.path(), "triad", &three_atoms())))
            .unwrap();
        assert!(s.is_busy());
        s.execute(Command::Cancel).unwrap();
        assert!(!s.is_busy());
        assert_eq!(s.status(), "Cancelled");
        std::thread::sleep(Duration::from_millis(200));
        let _ = s.poll();
        assert!(s.registry().is_empty());
        assert!(s.viewport().is_empty());
    }

    #[test]
    fn malformed_fetch_id_fails_immediately() {
        let mut s = session();
        assert!(matches!(
            s.execute(Command::Fetch("not-an-id".into())),
            Err(BiovisError::Fetch(_))
        ));
        assert!(!s.is_busy());
        assert_eq!(s.take_notices()[0].title, "Download Error");
    }

    #[test]
    fn panel_state_tracks_selection() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = loaded_session(dir.path());
        let state = s.panel_state();
        assert_eq!(state.structures, ["triad"]);
        assert_eq!(state.selected.as_deref(), Some("triad"));
        assert!(!state.has_surface);
        assert!(!state.busy);

        s.execute(Command::Select(None)).unwrap();
        assert_eq!(s.panel_state().selected, None);
        s.execute(Command::SelectNext).unwrap();
        assert_eq!(s.panel_state().selected.as_deref(), Some("triad"));
    }
}
