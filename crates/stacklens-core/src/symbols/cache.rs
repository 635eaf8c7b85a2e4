//! # Image Cache
//!
//! Process-wide cache of parsed binary images, keyed by path and load address.
//!
//! The cache is created once per process (see [`ImageCache::global`]) and
//! shared by every analyzer. Parsing an image is expensive, so the first
//! lookup that hits an image pays for it and every later lookup reuses it.
//! An image that fails to parse is remembered as failed, so the warning for it
//! is logged once and later lookups go straight to the fallback path.
//!
//! ## Naming images
//!
//! The loader does not always report a path that can be opened. The main
//! executable may be reported as `""` or as a relative `argv[0]`, and some
//! objects have no file at all (`linux-vdso.so.1`, deleted libraries). Only
//! the first kind is mapped to [`std::env::current_exe`]; the others have no
//! image and resolve through the loader's own symbols.
//!
//! ## Thread Safety
//!
//! The map sits behind a `Mutex`. A lookup holds the lock only for as long as
//! it resolves one address.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing::{debug, error, warn};

use super::dladdr::{self, LoaderInfo};
use super::image::BinaryImage;
use crate::error::{StackError, StackResult};

/// Images parsed so far, keyed by path and load address. `None` marks an
/// image that failed to parse.
pub(crate) struct ImageCache
{
    executable: PathBuf,
    executable_base: Option<usize>,
    images: Mutex<HashMap<(PathBuf, usize), Option<BinaryImage>>>,
}

static GLOBAL: OnceCell<Option<ImageCache>> = OnceCell::new();

impl ImageCache
{
    fn new() -> StackResult<Self>
    {
        let executable = std::env::current_exe()
            .map_err(|err| StackError::BackendInit(format!("unable to locate the running executable: {err}")))?;
        let executable_base = executable_base(&executable);
        debug!("executable {} mapped at {:?}", executable.display(), executable_base);

        Ok(Self {
            executable,
            executable_base,
            images: Mutex::new(HashMap::new()),
        })
    }

    /// The process-wide cache, initialized on first use.
    ///
    /// Returns `None` if initialization failed. The failure is logged once;
    /// callers treat it as "no backend available".
    pub(crate) fn global() -> Option<&'static ImageCache>
    {
        GLOBAL
            .get_or_init(|| match ImageCache::new() {
                Ok(cache) => Some(cache),
                Err(err) => {
                    error!("stack trace backend unavailable: {err}");
                    None
                }
            })
            .as_ref()
    }

    /// Run `lookup` against the image that contains `pc`.
    ///
    /// Returns `None` if no loaded object contains `pc`, the object has no
    /// readable file, or its image could not be parsed.
    pub(crate) fn with_image<T>(&self, pc: usize, lookup: impl FnOnce(&BinaryImage) -> T) -> Option<T>
    {
        let info = dladdr::query(pc)?;
        let path = self.image_path(&info)?;
        self.with_loaded(path, info.object_base, lookup)
    }

    /// Run `lookup` against the image at `path` loaded at `base`, parsing it
    /// on first use.
    fn with_loaded<T>(&self, path: PathBuf, base: usize, lookup: impl FnOnce(&BinaryImage) -> T) -> Option<T>
    {
        // A poisoned lock only means another resolver panicked mid-lookup;
        // the cached images themselves are never left half-built.
        let mut images = self.images.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let image = images.entry((path, base)).or_insert_with_key(|(path, base)| {
            match BinaryImage::parse(path, *base) {
                Ok(image) => {
                    debug!("loaded image {} (debug info: {})", image.path().display(), image.has_debug_info());
                    Some(image)
                }
                Err(err) => {
                    warn!("unable to load image {}: {err}", path.display());
                    None
                }
            }
        });

        image.as_ref().map(lookup)
    }

    /// Map the loader's description of an object to a readable path.
    ///
    /// Returns `None` for objects without a file on disk.
    fn image_path(&self, info: &LoaderInfo) -> Option<PathBuf>
    {
        let Some(reported) = info.object_path.as_deref() else {
            return Some(self.executable.clone());
        };

        match reported.canonicalize() {
            Ok(path) => Some(path),
            // A relative argv[0] after a chdir
            Err(_) if self.executable_base == Some(info.object_base) => Some(self.executable.clone()),
            Err(_) => None,
        }
    }
}

/// Load address of the running executable.
///
/// Found through an address inside this crate, and only trusted when the
/// loader names that object as the executable. Otherwise this crate lives in
/// a shared library and the executable's base stays unknown.
fn executable_base(executable: &Path) -> Option<usize>
{
    let info = dladdr::query(executable_base as usize)?;
    let is_executable = match info.object_path.as_deref() {
        None => true,
        Some(path) => matches!(
            (path.canonicalize(), executable.canonicalize()),
            (Ok(reported), Ok(executable)) if reported == executable
        ),
    };
    is_executable.then_some(info.object_base)
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use super::*;

    fn local_cache() -> ImageCache
    {
        let executable = std::env::current_exe().expect("current exe");
        ImageCache {
            executable_base: executable_base(&executable),
            executable,
            images: Mutex::new(HashMap::new()),
        }
    }

    fn loader_info(path: Option<&str>, base: usize) -> LoaderInfo
    {
        LoaderInfo {
            object_path: path.map(PathBuf::from),
            object_base: base,
            symbol_name: None,
            symbol_address: 0,
        }
    }

    #[test]
    fn test_global_is_initialized_once()
    {
        let first = ImageCache::global().expect("current_exe is available in tests");
        let second = ImageCache::global().expect("current_exe is available in tests");
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn test_with_image_resolves_own_code()
    {
        let cache = ImageCache::global().expect("cache");
        let pc = test_with_image_resolves_own_code as usize;
        let has_symbols = cache.with_image(pc + 1, |image| image.table_symbol(crate::Address::new(pc + 2)).is_some());
        assert_eq!(has_symbols, Some(true));
    }

    #[test]
    fn test_executable_base_is_known_in_tests()
    {
        let cache = local_cache();
        let own = dladdr::query(local_cache as usize).expect("test binary is loaded");
        assert_eq!(cache.executable_base, Some(own.object_base));
    }

    #[test]
    fn test_image_path_without_name_is_executable()
    {
        let cache = local_cache();
        assert_eq!(cache.image_path(&loader_info(None, 0x1000)), Some(cache.executable.clone()));
    }

    #[test]
    fn test_image_path_unreadable_object_has_no_image()
    {
        let cache = local_cache();
        let base = cache.executable_base.expect("executable base").wrapping_add(0x10_0000);
        assert_eq!(cache.image_path(&loader_info(Some("linux-vdso.so.1"), base)), None);
    }

    #[test]
    fn test_image_path_relative_name_at_executable_base()
    {
        let cache = local_cache();
        let base = cache.executable_base.expect("executable base");
        let info = loader_info(Some("relative/name/that/does/not/exist"), base);
        assert_eq!(cache.image_path(&info), Some(cache.executable.clone()));
    }

    #[test]
    fn test_failed_parse_is_remembered()
    {
        let cache = local_cache();
        let path = std::env::temp_dir().join(format!("stacklens-cache-{}", std::process::id()));
        fs::write(&path, b"definitely not an object file").expect("write temp file");

        assert_eq!(cache.with_loaded(path.clone(), 0, |_| ()), None);

        // A valid object now sits at the same path. The remembered failure
        // means it is not parsed again.
        fs::copy(&cache.executable, &path).expect("copy executable");
        assert_eq!(cache.with_loaded(path.clone(), 0, |_| ()), None);

        let images = cache.images.lock().expect("lock");
        assert_eq!(images.len(), 1);
        assert!(images.get(&(path.clone(), 0)).is_some_and(Option::is_none));
        drop(images);

        // A different load address is a different image
        assert_eq!(cache.with_loaded(path.clone(), 0x1000, |_| ()), Some(()));
        let _ = fs::remove_file(&path);
    }
}
