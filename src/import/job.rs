use std::io;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use log::{error, info};

use super::{load_obj, ImportError};
use crate::gfx::scene::{NodeId, SharedScene};

/// Imports `path` on a worker thread.
///
/// The file is parsed without holding the scene lock; the lock is taken only
/// for the splice, so a render loop sharing `scene` stalls for the upload and
/// nothing else. `on_done` runs on the worker after the lock is released.
pub fn spawn_import<F>(scene: SharedScene, path: impl Into<PathBuf>, on_done: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce(Result<NodeId, ImportError>) + Send + 'static,
{
    let path = path.into();
    thread::Builder::new()
        .name(String::from("obj-import"))
        .spawn(move || {
            let result = load_obj(&path).and_then(|imported| {
                let mut context = scene.lock().map_err(|_| ImportError::Poisoned)?;
                imported.splice(&mut context)
            });

            match &result {
                Ok(group) => info!("Finished importing {} into {:?}", path.display(), group),
                Err(e) => error!("Failed to import {}: {}", path.display(), e),
            }
            on_done(result);
        })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::gfx::device::RecordingDevice;
    use crate::gfx::scene::DrawContext;

    fn shared_scene() -> SharedScene {
        Arc::new(Mutex::new(
            DrawContext::with_default_effects(Box::new(RecordingDevice::new())).unwrap(),
        ))
    }

    #[test]
    fn test_background_import_splices_under_root() {
        let dir = std::env::temp_dir().join(format!("meshview_job_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("triangle.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let scene = shared_scene();
        let (tx, rx) = mpsc::channel();
        spawn_import(Arc::clone(&scene), path, move |result| {
            tx.send(result.map_err(|e| e.to_string())).unwrap();
        })
        .unwrap()
        .join()
        .unwrap();

        let group = rx.recv().unwrap().unwrap();
        let context = scene.lock().unwrap();
        let node = context.graph().get(group).unwrap();
        assert_eq!(node.parent(), Some(context.root()));
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn test_background_import_reports_failure() {
        let scene = shared_scene();
        let (tx, rx) = mpsc::channel();
        spawn_import(Arc::clone(&scene), "/nonexistent/meshview/missing.obj", move |result| {
            tx.send(result.is_err()).unwrap();
        })
        .unwrap()
        .join()
        .unwrap();

        assert!(rx.recv().unwrap());
        assert_eq!(scene.lock().unwrap().graph().len(), 1);
    }
}
