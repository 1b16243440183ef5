//! CrudService: generic resource service over the repository.

mod crud;
mod options;
pub use crud::CrudService;
pub use options::{FindOptions, OrderByInput, DEFAULT_LIMIT, DEFAULT_OFFSET};
