use crate::csv_repo::CsvRepo;
use crate::kv::TieredStore;
use crate::session_repo::SessionRepo;
use std::sync::Arc;

mod csv_repo;
mod session_repo;

pub use csv_repo::KvCsvRepo;
pub use session_repo::KvSessionRepo;

pub fn create_repos(store: Arc<TieredStore>) -> (Arc<dyn SessionRepo>, Arc<dyn CsvRepo>) {
    let session_repo = KvSessionRepo::new(store.clone());
    let csv_repo = KvCsvRepo::new(store);

    (Arc::new(session_repo), Arc::new(csv_repo))
}
