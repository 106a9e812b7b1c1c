use crate::error::{Error, Result};
use crate::schema::Stock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tickerwatch_util::Storage;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Storage key holding every watchlist as one blob.
pub const WATCHLIST_STORAGE_KEY: &str = "stocks_watchlists";

/// Watchlist name → stocks. Lists are keyed by name; stocks keep insertion order.
pub type Watchlists = BTreeMap<String, Vec<Stock>>;

/// What a mutation did to the working copy.
enum Change<R> {
    Unchanged(R),
    Changed(R),
}

/// Named watchlists persisted under [`WATCHLIST_STORAGE_KEY`].
///
/// Each mutation is a small transaction run under one mutex: load the blob (the
/// first time), change a copy, persist the whole copy, and only then make it
/// the visible state. A failed write leaves the previous state in place, and
/// since everything sits under a single key no crash can expose a half-applied
/// change.
pub struct WatchlistStore {
    storage: Arc<dyn Storage>,
    state: Mutex<Option<Watchlists>>,
}

impl WatchlistStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            state: Mutex::new(None),
        }
    }

    /// Re-read every watchlist from storage. Missing or corrupt data loads as
    /// an empty collection.
    pub async fn load_watchlists(&self) -> Watchlists {
        let mut state = self.state.lock().await;
        let loaded = self.read_storage().await;
        *state = Some(loaded.clone());
        loaded
    }

    /// Snapshot of all watchlists.
    pub async fn watchlists(&self) -> Watchlists {
        self.transact(|lists| Ok(Change::Unchanged(lists.clone())))
            .await
            .unwrap_or_default()
    }

    pub async fn watchlist_names(&self) -> Vec<String> {
        self.watchlists().await.into_keys().collect()
    }

    /// Stocks in the watchlist `name`, `None` if there is no such list.
    pub async fn watchlist(&self, name: &str) -> Option<Vec<Stock>> {
        let name = name.trim().to_string();
        self.transact(move |lists| Ok(Change::Unchanged(lists.get(&name).cloned())))
            .await
            .ok()
            .flatten()
    }

    /// Create an empty watchlist. Returns the trimmed name it was stored under.
    pub async fn create_watchlist(&self, name: &str) -> Result<String> {
        let name = validate_name(name)?;
        self.transact(move |lists| {
            if lists.contains_key(&name) {
                return Err(Error::AlreadyExists(name));
            }
            lists.insert(name.clone(), Vec::new());
            info!("created watchlist \"{name}\"");
            Ok(Change::Changed(name))
        })
        .await
    }

    /// Remove the watchlist `name`. Returns whether it existed.
    pub async fn delete_watchlist(&self, name: &str) -> Result<bool> {
        let name = name.trim().to_string();
        self.transact(move |lists| match lists.remove(&name) {
            Some(_) => {
                info!("deleted watchlist \"{name}\"");
                Ok(Change::Changed(true))
            }
            None => Ok(Change::Unchanged(false)),
        })
        .await
    }

    /// Append `stock` to the watchlist `name`, creating the list if needed.
    ///
    /// The ticker is stored trimmed, as every lookup trims its input. A ticker
    /// that is already on the list gives [`Error::DuplicateEntry`] and leaves
    /// the list untouched.
    pub async fn add_stock_to_watchlist(&self, name: &str, mut stock: Stock) -> Result<()> {
        let name = validate_name(name)?;
        stock.ticker = stock.ticker.trim().to_string();
        if stock.ticker.is_empty() {
            return Err(Error::InvalidArgument("Ticker cannot be empty.".to_string()));
        }
        self.transact(move |lists| {
            let list = lists.entry(name.clone()).or_default();
            if list.iter().any(|s| s.ticker == stock.ticker) {
                return Err(Error::DuplicateEntry {
                    ticker: stock.ticker,
                    watchlist: name,
                });
            }
            debug!("adding {} to watchlist \"{name}\"", stock.ticker);
            list.push(stock);
            Ok(Change::Changed(()))
        })
        .await
    }

    /// Remove `ticker` from the watchlist `name` only. Returns whether anything
    /// was removed.
    pub async fn remove_stock_from_specific_watchlist(
        &self,
        name: &str,
        ticker: &str,
    ) -> Result<bool> {
        let name = name.trim().to_string();
        let ticker = ticker.trim().to_string();
        self.transact(move |lists| {
            let Some(list) = lists.get_mut(&name) else {
                return Ok(Change::Unchanged(false));
            };
            let before = list.len();
            list.retain(|s| s.ticker != ticker);
            if list.len() == before {
                Ok(Change::Unchanged(false))
            } else {
                debug!("removed {ticker} from watchlist \"{name}\"");
                Ok(Change::Changed(true))
            }
        })
        .await
    }

    /// Remove `ticker` from every watchlist with a single write. Returns how
    /// many watchlists contained it.
    pub async fn remove_stock_from_watchlist(&self, ticker: &str) -> Result<usize> {
        let ticker = ticker.trim().to_string();
        self.transact(move |lists| {
            let mut affected = 0;
            for list in lists.values_mut() {
                let before = list.len();
                list.retain(|s| s.ticker != ticker);
                if list.len() != before {
                    affected += 1;
                }
            }
            if affected == 0 {
                Ok(Change::Unchanged(0))
            } else {
                debug!("removed {ticker} from {affected} watchlist(s)");
                Ok(Change::Changed(affected))
            }
        })
        .await
    }

    pub async fn is_stock_in_any_watchlist(&self, ticker: &str) -> bool {
        let ticker = ticker.trim().to_string();
        self.transact(move |lists| {
            Ok(Change::Unchanged(
                lists.values().flatten().any(|s| s.ticker == ticker),
            ))
        })
        .await
        .unwrap_or(false)
    }

    // ---------------------------------------------------------------------------------------------

    async fn transact<R, F>(&self, apply: F) -> Result<R>
    where
        F: FnOnce(&mut Watchlists) -> Result<Change<R>>,
    {
        let mut state = self.state.lock().await;
        let current = match state.take() {
            Some(lists) => lists,
            None => self.read_storage().await,
        };

        let mut next = current.clone();
        match apply(&mut next) {
            Err(e) => {
                *state = Some(current);
                Err(e)
            }
            Ok(Change::Unchanged(out)) => {
                *state = Some(current);
                Ok(out)
            }
            Ok(Change::Changed(out)) => match self.persist(&next).await {
                Ok(()) => {
                    *state = Some(next);
                    Ok(out)
                }
                Err(e) => {
                    *state = Some(current);
                    Err(e)
                }
            },
        }
    }

    async fn read_storage(&self) -> Watchlists {
        match self.storage.get_item(WATCHLIST_STORAGE_KEY).await {
            Ok(Some(text)) => match serde_json::from_str(&text) {
                Ok(lists) => lists,
                Err(e) => {
                    warn!("stored watchlists are corrupt, starting empty: {e}");
                    Watchlists::new()
                }
            },
            Ok(None) => Watchlists::new(),
            Err(e) => {
                warn!("failed to load watchlists, starting empty: {e:#}");
                Watchlists::new()
            }
        }
    }

    async fn persist(&self, lists: &Watchlists) -> Result<()> {
        let text = serde_json::to_string(lists).map_err(|e| Error::Storage(e.to_string()))?;
        self.storage
            .set_item(WATCHLIST_STORAGE_KEY, &text)
            .await
            .map_err(|e| {
                error!("failed to save watchlists: {e:#}");
                Error::Storage(format!("{e:#}"))
            })
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument(
            "Watchlist name cannot be empty.".to_string(),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tickerwatch_util::MemoryStorage;

    fn aapl() -> Stock {
        Stock::new("AAPL", "150", "-1.2%")
    }

    fn store() -> (WatchlistStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (WatchlistStore::new(storage.clone()), storage)
    }

    async fn stored(storage: &MemoryStorage) -> Option<String> {
        storage.get_item(WATCHLIST_STORAGE_KEY).await.unwrap()
    }

    #[tokio::test]
    async fn create_trims_and_rejects_blank_names() {
        let (store, _) = store();
        assert_eq!(store.create_watchlist("  Tech ").await.unwrap(), "Tech");
        assert!(matches!(
            store.create_watchlist("   ").await,
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(store.watchlist_names().await, vec!["Tech".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_create_changes_nothing() {
        let (store, storage) = store();
        store.create_watchlist("Tech").await.unwrap();
        store.add_stock_to_watchlist("Tech", aapl()).await.unwrap();
        let before = stored(&storage).await;

        let err = store.create_watchlist(" Tech").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(ref n) if n == "Tech"));
        assert_eq!(stored(&storage).await, before);
        assert_eq!(store.watchlist("Tech").await.unwrap(), vec![aapl()]);
    }

    #[tokio::test]
    async fn names_are_case_sensitive() {
        let (store, _) = store();
        store.create_watchlist("tech").await.unwrap();
        store.create_watchlist("Tech").await.unwrap();
        assert_eq!(store.watchlists().await.len(), 2);
    }

    #[tokio::test]
    async fn adding_twice_keeps_one_entry() {
        let (store, _) = store();
        store.add_stock_to_watchlist("Tech", aapl()).await.unwrap();
        let err = store
            .add_stock_to_watchlist("Tech", aapl())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry { .. }));

        let list = store.watchlist("Tech").await.unwrap();
        assert_eq!(list.iter().filter(|s| s.ticker == "AAPL").count(), 1);
    }

    #[tokio::test]
    async fn padded_tickers_are_stored_trimmed() {
        let (store, _) = store();
        store
            .add_stock_to_watchlist("Tech", Stock::new(" AAPL ", "150", "1.2%"))
            .await
            .unwrap();
        store
            .add_stock_to_watchlist("Faves", Stock::new("AAPL", "150", "1.2%"))
            .await
            .unwrap();

        assert_eq!(store.watchlist("Tech").await.unwrap()[0].ticker, "AAPL");
        assert!(store.is_stock_in_any_watchlist(" AAPL ").await);
        assert!(matches!(
            store
                .add_stock_to_watchlist("Tech", Stock::new("AAPL ", "1", "0%"))
                .await,
            Err(Error::DuplicateEntry { .. })
        ));

        assert!(store
            .remove_stock_from_specific_watchlist("Tech", " AAPL ")
            .await
            .unwrap());
        assert_eq!(store.remove_stock_from_watchlist(" AAPL ").await.unwrap(), 1);
        assert!(!store.is_stock_in_any_watchlist("AAPL").await);
    }

    #[tokio::test]
    async fn add_creates_missing_list_and_keeps_order() {
        let (store, _) = store();
        for ticker in ["MSFT", "AAPL", "NVDA"] {
            store
                .add_stock_to_watchlist("Mega", Stock::new(ticker, "1", "0%"))
                .await
                .unwrap();
        }
        let tickers: Vec<String> = store
            .watchlist("Mega")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.ticker)
            .collect();
        assert_eq!(tickers, vec!["MSFT", "AAPL", "NVDA"]);
    }

    #[tokio::test]
    async fn delete_removes_and_ignores_missing() {
        let (store, _) = store();
        store.create_watchlist("Tech").await.unwrap();
        assert!(store.delete_watchlist("Tech").await.unwrap());
        assert!(!store.delete_watchlist("Tech").await.unwrap());
        assert!(store.watchlists().await.is_empty());
    }

    #[tokio::test]
    async fn specific_remove_only_touches_that_list() {
        let (store, _) = store();
        store.add_stock_to_watchlist("Tech", aapl()).await.unwrap();
        store.add_stock_to_watchlist("Faves", aapl()).await.unwrap();

        assert!(store
            .remove_stock_from_specific_watchlist("Tech", "AAPL")
            .await
            .unwrap());
        assert!(!store
            .remove_stock_from_specific_watchlist("Nope", "AAPL")
            .await
            .unwrap());

        assert!(store.watchlist("Tech").await.unwrap().is_empty());
        assert_eq!(store.watchlist("Faves").await.unwrap(), vec![aapl()]);
        assert!(store.is_stock_in_any_watchlist("AAPL").await);
    }

    #[tokio::test]
    async fn global_remove_clears_every_list() {
        let (store, _) = store();
        store.create_watchlist("Tech").await.unwrap();
        store.add_stock_to_watchlist("Tech", aapl()).await.unwrap();
        store.add_stock_to_watchlist("Faves", aapl()).await.unwrap();
        store
            .add_stock_to_watchlist("Faves", Stock::new("IBM", "180", "0.5%"))
            .await
            .unwrap();

        assert_eq!(store.remove_stock_from_watchlist("AAPL").await.unwrap(), 2);
        assert!(store.watchlist("Tech").await.unwrap().is_empty());
        assert!(!store.is_stock_in_any_watchlist("AAPL").await);
        assert!(store.is_stock_in_any_watchlist("IBM").await);

        assert_eq!(store.remove_stock_from_watchlist("AAPL").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn state_survives_a_reload() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let store = WatchlistStore::new(storage.clone());
            store.add_stock_to_watchlist("Tech", aapl()).await.unwrap();
        }
        let store = WatchlistStore::new(storage);
        let lists = store.load_watchlists().await;
        assert_eq!(lists.get("Tech"), Some(&vec![aapl()]));
    }

    #[tokio::test]
    async fn corrupt_blob_loads_empty() {
        let (store, storage) = store();
        storage
            .set_item(WATCHLIST_STORAGE_KEY, "[not a map")
            .await
            .unwrap();
        assert!(store.load_watchlists().await.is_empty());
    }

    /// Storage that counts writes and can be told to reject them.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        reject_writes: AtomicBool,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl Storage for FlakyStorage {
        async fn get_item(&self, key: &str) -> anyhow::Result<Option<String>> {
            self.inner.get_item(key).await
        }

        async fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.reject_writes.load(Ordering::SeqCst) {
                bail!("disk full");
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set_item(key, value).await
        }

        async fn remove_item(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove_item(key).await
        }
    }

    #[tokio::test]
    async fn global_remove_is_a_single_write() {
        let storage = Arc::new(FlakyStorage::default());
        let store = WatchlistStore::new(storage.clone());
        for name in ["A", "B", "C"] {
            store.add_stock_to_watchlist(name, aapl()).await.unwrap();
        }
        let writes = storage.writes.load(Ordering::SeqCst);

        assert_eq!(store.remove_stock_from_watchlist("AAPL").await.unwrap(), 3);
        assert_eq!(storage.writes.load(Ordering::SeqCst), writes + 1);
    }

    #[tokio::test]
    async fn failed_write_is_not_reflected() {
        let storage = Arc::new(FlakyStorage::default());
        let store = WatchlistStore::new(storage.clone());
        store.create_watchlist("Tech").await.unwrap();

        storage.reject_writes.store(true, Ordering::SeqCst);
        let err = store.add_stock_to_watchlist("Tech", aapl()).await;
        assert!(matches!(err, Err(Error::Storage(_))));
        assert!(store.watchlist("Tech").await.unwrap().is_empty());
        assert!(!store.is_stock_in_any_watchlist("AAPL").await);
    }

    #[tokio::test]
    async fn concurrent_adds_are_serialized() {
        let (store, _) = store();
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .add_stock_to_watchlist("Tech", Stock::new(format!("T{i}"), "1", "0%"))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let reloaded = store.load_watchlists().await;
        assert_eq!(reloaded.get("Tech").map(Vec::len), Some(20));
    }
}
