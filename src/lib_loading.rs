//! Library loading routines.

use std::ops::Deref;

use libloading::Library;

pub trait SymLoading {
    /// # Safety
    /// The library must be ensured to live long enough.
    unsafe fn load_with(lib: &Library) -> Self;
}

pub struct SymWrapper<T> {
    sym: T,
    _lib: Library,
}

impl<T: SymLoading> SymWrapper<T> {
    /// Load the first of `lib_paths` that opens and bind `T` from it.
    ///
    /// # Safety
    /// Loading a library runs its initialisers.
    pub unsafe fn new(lib_paths: &[&str]) -> Option<Self> {
        for path in lib_paths {
            if let Ok(lib) = unsafe { Library::new(path) } {
                log::debug!("loaded {path}");
                return Some(SymWrapper { sym: unsafe { T::load_with(&lib) }, _lib: lib });
            }
        }

        None
    }
}

/// Open the first of `lib_paths` that can be loaded.
///
/// # Safety
/// Loading a library runs its initialisers.
pub unsafe fn open_first(lib_paths: &[&str]) -> Option<Library> {
    lib_paths.iter().find_map(|path| unsafe { Library::new(path) }.ok())
}

impl<T> Deref for SymWrapper<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.sym
    }
}
