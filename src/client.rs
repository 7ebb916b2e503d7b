//! The entry point for querying the transaction mirror.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use rusqlite::Connection;

use crate::{
    Error,
    account::{Account, get_accounts, import_accounts},
    catalogue::{
        Site, SiteOrganization, get_site_organizations, get_sites, import_site_organizations,
        import_sites,
    },
    config::QueryConfig,
    context::QueryContext,
    credential::{Credential, get_credentials, import_credentials},
    db::initialize,
    session::{Session, create_session},
    transaction::{
        Transaction, TransactionQuery, count_transactions, get_transactions, import_transactions,
    },
    user::{User, import_users},
};

/// A handle on the transaction mirror.
///
/// Cloning is cheap and every clone shares the same connection, so a client
/// can be handed to several threads that query different partitions at once.
/// Each call holds the connection for the whole call, so calls never see
/// each other's partial results.
#[derive(Debug, Clone)]
pub struct Client {
    connection: Arc<Mutex<Connection>>,
    config: QueryConfig,
}

impl Client {
    /// Create a client over an SQLite `connection`.
    ///
    /// The schema is created if it does not exist yet.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the schema cannot be created.
    pub fn new(connection: Connection, config: QueryConfig) -> Result<Self, Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            config,
        })
    }

    /// Open the SQLite database at `path` and create a client over it.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>, config: QueryConfig) -> Result<Self, Error> {
        let connection = Connection::open(path)?;
        Self::new(connection, config)
    }

    /// The config this client applies to queries.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| {
            tracing::error!("the connection lock is poisoned");
            Error::UpstreamUnavailable("could not acquire the database lock".to_owned())
        })
    }

    /// Open a session for the user `id_user`.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the user is unknown or the
    /// session cannot be stored.
    pub fn create_session(&self, id_user: &str) -> Result<Session, Error> {
        create_session(id_user, &*self.connection()?)
    }

    /// Count the transactions visible to `context` that match `query`.
    ///
    /// Pagination in `query` is ignored.
    ///
    /// # Errors
    /// Returns [Error::InvalidFilter] for malformed filters and
    /// [Error::UpstreamUnavailable] if the context cannot be resolved or the
    /// mirror cannot be read.
    pub fn count_transactions(
        &self,
        context: &QueryContext,
        query: &TransactionQuery,
    ) -> Result<u64, Error> {
        let connection = self.connection()?;
        let id_user = context.resolve(&connection)?;

        count_transactions(&id_user, query, &connection)
    }

    /// Get the page of transactions visible to `context` that match `query`.
    ///
    /// # Errors
    /// Returns [Error::InvalidFilter] for malformed filters, pages larger than
    /// the configured maximum and unbounded bulk queries when the config
    /// forbids them. Returns [Error::UpstreamUnavailable] if the context cannot
    /// be resolved or the mirror cannot be read.
    pub fn get_transactions(
        &self,
        context: &QueryContext,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, Error> {
        let connection = self.connection()?;
        let id_user = context.resolve(&connection)?;

        get_transactions(&id_user, query, &self.config, &connection)
    }

    /// Get the accounts owned by the user of `context`.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the context cannot be resolved
    /// or the mirror cannot be read.
    pub fn get_accounts(&self, context: &QueryContext) -> Result<Vec<Account>, Error> {
        let connection = self.connection()?;
        let id_user = context.resolve(&connection)?;

        get_accounts(&id_user, &connection)
    }

    /// Get the credentials linked by the user of `context`.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the context cannot be resolved
    /// or the mirror cannot be read.
    pub fn get_credentials(&self, context: &QueryContext) -> Result<Vec<Credential>, Error> {
        let connection = self.connection()?;
        let id_user = context.resolve(&connection)?;

        get_credentials(&id_user, &connection)
    }

    /// Get the site catalogue.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the context cannot be resolved
    /// or the mirror cannot be read.
    pub fn get_sites(&self, context: &QueryContext) -> Result<Vec<Site>, Error> {
        let connection = self.connection()?;
        context.resolve(&connection)?;

        get_sites(&connection)
    }

    /// Get the site organization catalogue.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the context cannot be resolved
    /// or the mirror cannot be read.
    pub fn get_site_organizations(
        &self,
        context: &QueryContext,
    ) -> Result<Vec<SiteOrganization>, Error> {
        let connection = self.connection()?;
        context.resolve(&connection)?;

        get_site_organizations(&connection)
    }

    /// Sync upstream users into the mirror. Returns the newly inserted users.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the mirror cannot be written.
    pub fn import_users(&self, users: Vec<User>) -> Result<Vec<User>, Error> {
        import_users(users, &*self.connection()?)
    }

    /// Sync upstream site organizations into the mirror.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the mirror cannot be written.
    pub fn import_site_organizations(
        &self,
        organizations: Vec<SiteOrganization>,
    ) -> Result<Vec<SiteOrganization>, Error> {
        import_site_organizations(organizations, &*self.connection()?)
    }

    /// Sync upstream sites into the mirror.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the mirror cannot be written.
    pub fn import_sites(&self, sites: Vec<Site>) -> Result<Vec<Site>, Error> {
        import_sites(sites, &*self.connection()?)
    }

    /// Sync upstream credentials into the mirror.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the mirror cannot be written.
    pub fn import_credentials(&self, credentials: Vec<Credential>) -> Result<Vec<Credential>, Error> {
        import_credentials(credentials, &*self.connection()?)
    }

    /// Sync upstream accounts into the mirror.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the mirror cannot be written.
    pub fn import_accounts(&self, accounts: Vec<Account>) -> Result<Vec<Account>, Error> {
        import_accounts(accounts, &*self.connection()?)
    }

    /// Sync upstream transactions into the mirror.
    ///
    /// # Errors
    /// Returns [Error::UpstreamUnavailable] if the mirror cannot be written.
    pub fn import_transactions(
        &self,
        transactions: Vec<Transaction>,
    ) -> Result<Vec<Transaction>, Error> {
        import_transactions(transactions, &*self.connection()?)
    }
}

#[cfg(test)]
impl Client {
    /// Direct access to the connection for test setup and assertions.
    pub(crate) fn lock_for_test(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap()
    }

    /// Poison the connection lock by panicking while holding it.
    pub(crate) fn poison_for_test(&self) {
        let connection = Arc::clone(&self.connection);
        let _ = std::thread::spawn(move || {
            let _guard = connection.lock().unwrap();
            panic!("poisoning the connection lock");
        })
        .join();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use time::Duration;

    use crate::{
        Error,
        context::QueryContext,
        session::Session,
        test_utils::{Fixture, IN_WINDOW_COUNT, KEYWORDS, QUARTER_OF_JANUARY_SECONDS, SAT_ID_SITE},
        transaction::{KeywordFilter, Pagination, TransactionFilter, TransactionQuery},
    };

    #[test]
    fn total_count_is_positive() {
        let fixture = Fixture::new();

        let got = fixture
            .client
            .count_transactions(&fixture.context(), &TransactionFilter::default().into())
            .unwrap();

        assert!(got > 0, "want transactions for the test user, got {got}");
    }

    #[test]
    fn get_returns_as_many_transactions_as_count() {
        let fixture = Fixture::new();
        let query = fixture.window_filter().into();

        let count = fixture.client.count_transactions(&fixture.context(), &query).unwrap();
        let got = fixture.client.get_transactions(&fixture.context(), &query).unwrap();

        assert_eq!(count, IN_WINDOW_COUNT);
        assert_eq!(got.len() as u64, count);
    }

    #[test]
    fn raw_user_context_sees_same_transactions_as_session() {
        let fixture = Fixture::new();
        let query = fixture.window_filter().into();

        let via_session = fixture.client.get_transactions(&fixture.context(), &query).unwrap();
        let via_user = fixture
            .client
            .get_transactions(&QueryContext::User(fixture.id_user.clone()), &query)
            .unwrap();

        assert_eq!(via_session, via_user);
    }

    #[test]
    fn exact_match_by_id_returns_one_transaction() {
        let fixture = Fixture::new();

        let got = fixture
            .client
            .get_transactions(
                &fixture.context(),
                &TransactionQuery::ById(fixture.known_id_transaction.clone()),
            )
            .unwrap();

        assert_eq!(got.len(), 1, "want exactly one transaction, got {got:?}");
        assert_eq!(got[0].id_transaction, fixture.known_id_transaction);
    }

    #[test]
    fn account_partition_sums_to_total() {
        let fixture = Fixture::new();
        let context = fixture.context();
        let accounts = fixture.client.get_accounts(&context).unwrap();

        let got: u64 = accounts
            .iter()
            .map(|account| {
                let query = fixture.window_filter().account(account.id_account.clone()).into();
                fixture.client.get_transactions(&context, &query).unwrap().len() as u64
            })
            .sum();

        assert_eq!(got, IN_WINDOW_COUNT);
    }

    #[test]
    fn credential_partition_sums_to_total() {
        let fixture = Fixture::new();
        let context = fixture.context();
        let credentials = fixture.client.get_credentials(&context).unwrap();

        let got: u64 = credentials
            .iter()
            .map(|credential| {
                let query = fixture
                    .window_filter()
                    .credential(credential.id_credential.clone())
                    .into();
                fixture.client.get_transactions(&context, &query).unwrap().len() as u64
            })
            .sum();

        assert_eq!(got, IN_WINDOW_COUNT);
    }

    #[test]
    fn site_partition_sums_to_total() {
        let fixture = Fixture::new();
        let context = fixture.context();
        let sites = fixture.client.get_sites(&context).unwrap();

        let got: u64 = sites
            .iter()
            .map(|site| {
                let query = fixture.window_filter().site(site.id_site.clone()).into();
                fixture.client.get_transactions(&context, &query).unwrap().len() as u64
            })
            .sum();

        assert_eq!(got, IN_WINDOW_COUNT);
    }

    #[test]
    fn site_organization_partition_sums_to_total() {
        let fixture = Fixture::new();
        let context = fixture.context();
        let organizations = fixture.client.get_site_organizations(&context).unwrap();

        let got: u64 = organizations
            .iter()
            .map(|organization| {
                let query = fixture
                    .window_filter()
                    .site_organization(organization.id_site_organization.clone())
                    .into();
                fixture.client.get_transactions(&context, &query).unwrap().len() as u64
            })
            .sum();

        assert_eq!(got, IN_WINDOW_COUNT);
    }

    #[test]
    fn parallel_account_counts_sum_to_total() {
        let fixture = Fixture::new();
        let context = fixture.context();
        let accounts = fixture.client.get_accounts(&context).unwrap();

        let got: u64 = thread::scope(|scope| {
            let handles: Vec<_> = accounts
                .iter()
                .map(|account| {
                    let client = fixture.client.clone();
                    let context = context.clone();
                    let query: TransactionQuery =
                        fixture.window_filter().account(account.id_account.clone()).into();
                    scope.spawn(move || client.count_transactions(&context, &query).unwrap())
                })
                .collect();

            handles.into_iter().map(|handle| handle.join().unwrap()).sum()
        });

        assert_eq!(got, IN_WINDOW_COUNT);
    }

    #[test]
    fn weekly_windows_sum_to_total() {
        let fixture = Fixture::new();
        let context = fixture.context();
        let weeks = fixture
            .window
            .split_every(Duration::seconds(QUARTER_OF_JANUARY_SECONDS))
            .unwrap();

        let got: u64 = weeks
            .into_iter()
            .map(|week| {
                let query = TransactionFilter::default().window(week).into();
                fixture.client.get_transactions(&context, &query).unwrap().len() as u64
            })
            .sum();

        assert_eq!(got, IN_WINDOW_COUNT);
    }

    #[test]
    fn pages_of_eight_cover_every_transaction_once() {
        let fixture = Fixture::new();
        let context = fixture.context();
        let batch_size = 8;
        let page_count = IN_WINDOW_COUNT / batch_size + 1;
        let everything = fixture
            .client
            .get_transactions(&context, &fixture.window_filter().into())
            .unwrap();

        let mut page = Pagination::new(0, batch_size as i64).unwrap();
        let mut paged = Vec::new();
        for i in 0..page_count {
            let query = fixture.window_filter().paginate(page).into();
            let got = fixture.client.get_transactions(&context, &query).unwrap();

            if i == page_count - 1 {
                assert!(
                    !got.is_empty() && (got.len() as u64) <= batch_size,
                    "want a partial last page, got {} transactions",
                    got.len()
                );
            } else {
                assert_eq!(got.len() as u64, batch_size, "page {i} is not full");
            }

            paged.extend(got);
            page = page.next_page().unwrap();
        }

        assert_eq!(paged.len() as u64, IN_WINDOW_COUNT);
        assert_eq!(paged, everything, "want pages to concatenate to the full result");
    }

    #[test]
    fn keywords_and_skip_keywords_partition_sat_transactions() {
        let fixture = Fixture::new();
        let context = fixture.context();
        let sat_credential = fixture
            .client
            .get_credentials(&context)
            .unwrap()
            .into_iter()
            .find(|credential| credential.id_site == SAT_ID_SITE)
            .expect("fixture has a SAT credential");
        let base = fixture.window_filter().credential(sat_credential.id_credential);
        let total = fixture
            .client
            .count_transactions(&context, &base.clone().into())
            .unwrap();

        for keyword in KEYWORDS {
            let included = fixture
                .client
                .get_transactions(
                    &context,
                    &base.clone().keywords(KeywordFilter::include(keyword)).into(),
                )
                .unwrap()
                .len() as u64;
            let excluded = fixture
                .client
                .get_transactions(
                    &context,
                    &base.clone().keywords(KeywordFilter::exclude(keyword)).into(),
                )
                .unwrap()
                .len() as u64;

            assert_eq!(
                included + excluded,
                total,
                "keyword {keyword:?}: {included} included + {excluded} excluded != {total}"
            );
        }
    }

    #[test]
    fn zero_limit_and_negative_skip_are_rejected() {
        assert!(matches!(Pagination::new(0, 0), Err(Error::InvalidFilter(_))));
        assert!(matches!(Pagination::new(-8, 8), Err(Error::InvalidFilter(_))));
    }

    #[test]
    fn invalid_session_is_upstream_unavailable() {
        let fixture = Fixture::new();
        let context = QueryContext::Session(Session {
            token: "expired".to_owned(),
            id_user: fixture.id_user.clone(),
        });

        let got = fixture
            .client
            .count_transactions(&context, &fixture.window_filter().into());

        assert!(
            matches!(got, Err(Error::UpstreamUnavailable(_))),
            "want UpstreamUnavailable, got {got:?}"
        );
    }

    #[test]
    fn missing_table_is_upstream_unavailable() {
        let fixture = Fixture::new();
        fixture
            .client
            .lock_for_test()
            .execute("DROP TABLE \"transaction\"", ())
            .unwrap();

        let got = fixture
            .client
            .count_transactions(&fixture.context(), &fixture.window_filter().into());

        assert!(
            matches!(got, Err(Error::UpstreamUnavailable(_))),
            "want UpstreamUnavailable, got {got:?}"
        );
    }

    #[test]
    fn poisoned_lock_is_upstream_unavailable() {
        let fixture = Fixture::new();
        fixture.client.poison_for_test();

        let got = fixture
            .client
            .get_transactions(&fixture.context(), &fixture.window_filter().into());

        assert!(
            matches!(got, Err(Error::UpstreamUnavailable(_))),
            "want UpstreamUnavailable, got {got:?}"
        );
    }

    #[test]
    fn catalogues_require_a_valid_context() {
        let fixture = Fixture::new();
        let context = QueryContext::User("nobody".to_owned());

        let sites = fixture.client.get_sites(&context);
        let organizations = fixture.client.get_site_organizations(&context);

        assert!(matches!(sites, Err(Error::UpstreamUnavailable(_))), "got {sites:?}");
        assert!(
            matches!(organizations, Err(Error::UpstreamUnavailable(_))),
            "got {organizations:?}"
        );
    }
}
