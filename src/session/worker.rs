//! Background worker for parse, fetch, triangulation, and export jobs.
//!
//! One thread fed by an `mpsc` request channel; finished jobs come back on a
//! second channel and are drained by the session once per frame. Each job
//! carries a [`CancelToken`] that is checked between stages. Shutting down
//! raises a worker-wide stop flag, so queued jobs are skipped and only the
//! job in flight is waited for.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use crate::error::BiovisError;
use crate::geometry::{self, PointMesh, StlFormat, TriMesh};
use crate::loader::{self, LoadedStructure};
use crate::options::{FetchOptions, GeometryOptions};
use crate::scene::ModelId;
use crate::structure::fetch;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, un-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), BiovisError> {
        if self.is_cancelled() {
            Err(BiovisError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Identifier of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub(crate) u64);

/// Where a structure comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Local structure file.
    File(PathBuf),
    /// PDB identifier fetched from the remote archive.
    Remote(String),
}

/// Work the background thread can do.
#[derive(Debug, Clone)]
pub enum Job {
    /// Parse (and possibly download) a structure and tessellate its atoms.
    Load {
        /// Input to load.
        source: LoadSource,
        /// Atom radius and sphere resolution.
        geometry: GeometryOptions,
        /// Remote retrieval settings.
        fetch: FetchOptions,
    },
    /// Generate the closed surface of a model's atoms.
    Surface {
        /// Model the surface belongs to.
        model: ModelId,
        /// The model's atom spheres.
        points: Arc<PointMesh>,
    },
    /// Write a surface to an STL file.
    Export {
        /// Surface to write.
        mesh: Arc<TriMesh>,
        /// Destination file.
        path: PathBuf,
        /// Binary or ASCII.
        format: StlFormat,
    },
}

/// Successful job output.
#[derive(Debug)]
pub enum JobOutput {
    /// A structure ready to register.
    Loaded(LoadedStructure),
    /// A surface for `model`.
    Surface {
        /// Target model.
        model: ModelId,
        /// Generated mesh.
        mesh: TriMesh,
    },
    /// The surface file was written.
    Exported {
        /// Written file.
        path: PathBuf,
        /// Number of triangles written.
        triangles: usize,
    },
}

/// A finished job.
#[derive(Debug)]
pub struct JobResult {
    /// Job this result belongs to.
    pub id: JobId,
    /// Output or failure.
    pub outcome: Result<JobOutput, BiovisError>,
}

enum Request {
    Run {
        id: JobId,
        cancel: CancelToken,
        job: Job,
    },
    Shutdown,
}

/// Handle to the background worker thread.
pub struct Worker {
    request_tx: mpsc::Sender<Request>,
    result_rx: mpsc::Receiver<JobResult>,
    stop: CancelToken,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread.
    ///
    /// # Errors
    ///
    /// [`BiovisError::ThreadSpawn`] if the thread cannot be started.
    pub fn spawn() -> Result<Self, BiovisError> {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (result_tx, result_rx) = mpsc::channel::<JobResult>();
        let stop = CancelToken::new();

        let thread_stop = stop.clone();
        let thread = std::thread::Builder::new()
            .name("biovis-worker".into())
            .spawn(move || Self::thread_loop(&request_rx, &result_tx, &thread_stop))
            .map_err(BiovisError::ThreadSpawn)?;

        Ok(Self {
            request_tx,
            result_rx,
            stop,
            thread: Some(thread),
        })
    }

    /// Queue a job (non-blocking).
    pub fn submit(&self, id: JobId, cancel: CancelToken, job: Job) {
        let _ = self.request_tx.send(Request::Run { id, cancel, job });
    }

    /// Non-blocking check for a finished job.
    #[must_use]
    pub fn try_recv(&self) -> Option<JobResult> {
        self.result_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for a finished job.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<JobResult> {
        self.result_rx.recv_timeout(timeout).ok()
    }

    /// Stop the thread after the current job and wait for it. Jobs still
    /// queued are dropped without running.
    pub fn shutdown(&mut self) {
        self.stop.cancel();
        let _ = self.request_tx.send(Request::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn thread_loop(
        request_rx: &mpsc::Receiver<Request>,
        result_tx: &mpsc::Sender<JobResult>,
        stop: &CancelToken,
    ) {
        while let Ok(request) = request_rx.recv() {
            let Request::Run { id, cancel, job } = request else {
                break;
            };
            if stop.is_cancelled() {
                log::debug!("worker: stopping, skipping job {}", id.0);
                break;
            }
            log::debug!("worker: starting job {}", id.0);
            let outcome = cancel.check().and_then(|()| run(job, &cancel));
            if result_tx.send(JobResult { id, outcome }).is_err() {
                break;
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(job: Job, cancel: &CancelToken) -> Result<JobOutput, BiovisError> {
    match job {
        Job::Load {
            source,
            geometry,
            fetch: fetch_options,
        } => {
            let (path, name) = match source {
                LoadSource::File(path) => (path, None),
                LoadSource::Remote(id) => {
                    let name = fetch::normalize_pdb_id(&id)?;
                    (fetch::fetch_structure(&name, &fetch_options)?, Some(name))
                }
            };
            cancel.check()?;
            let loaded = loader::load_from_file(&path, name.as_deref(), &geometry)?;
            cancel.check()?;
            Ok(JobOutput::Loaded(loaded))
        }
        Job::Surface { model, points } => {
            let mesh = geometry::generate_surface(&points)?;
            cancel.check()?;
            Ok(JobOutput::Surface { model, mesh })
        }
        Job::Export { mesh, path, format } => {
            geometry::stl::write_stl(&mesh, &path, format)?;
            Ok(JobOutput::Exported {
                path,
                triangles: mesh.triangle_count(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::test_support::{three_atoms, write_pdb};

    const WAIT: Duration = Duration::from_secs(30);

    #[test]
    fn load_job_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pdb(dir.path(), "tri", &three_atoms());
        let worker = Worker::spawn().unwrap();
        worker.submit(
            JobId(7),
            CancelToken::new(),
            Job::Load {
                source: LoadSource::File(path),
                geometry: GeometryOptions::default(),
                fetch: FetchOptions::default(),
            },
        );
        let result = worker.recv_timeout(WAIT).unwrap();
        assert_eq!(result.id, JobId(7));
        match result.outcome {
            Ok(JobOutput::Loaded(loaded)) => assert_eq!(loaded.point_mesh.len(), 3),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn cancelled_job_does_not_run() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("never.stl");
        let worker = Worker::spawn().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        worker.submit(
            JobId(1),
            cancel,
            Job::Export {
                mesh: Arc::new(geometry::sphere::unit_sphere(4, 4)),
                path: target.clone(),
                format: StlFormat::Binary,
            },
        );
        let result = worker.recv_timeout(WAIT).unwrap();
        assert!(matches!(result.outcome, Err(BiovisError::Cancelled)));
        assert!(!target.exists());
    }

    #[test]
    fn shutdown_skips_queued_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let points = Arc::new(PointMesh::from_positions(
            &three_atoms(),
            &GeometryOptions::default(),
        ));
        let mut worker = Worker::spawn().unwrap();
        worker.stop.cancel();
        let target = dir.path().join("queued.stl");
        worker.submit(
            JobId(1),
            CancelToken::new(),
            Job::Surface {
                model: crate::scene::ModelId::for_tests(1),
                points,
            },
        );
        worker.submit(
            JobId(2),
            CancelToken::new(),
            Job::Export {
                mesh: Arc::new(geometry::sphere::unit_sphere(4, 4)),
                path: target.clone(),
                format: StlFormat::Binary,
            },
        );
        worker.shutdown();
        assert!(worker.try_recv().is_none());
        assert!(!target.exists());
    }

    #[test]
    fn jobs_finish_in_submission_order() {
        let points = Arc::new(PointMesh::from_positions(
            &three_atoms(),
            &GeometryOptions::default(),
        ));
        let worker = Worker::spawn().unwrap();
        for i in 0..3 {
            worker.submit(
                JobId(i),
                CancelToken::new(),
                Job::Surface {
                    model: crate::scene::ModelId::for_tests(i),
                    points: Arc::clone(&points),
                },
            );
        }
        for i in 0..3 {
            let result = worker.recv_timeout(WAIT).unwrap();
            assert_eq!(result.id, JobId(i));
            assert!(result.outcome.is_ok());
        }
    }
}
