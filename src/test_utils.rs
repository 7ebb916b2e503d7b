//! A seeded mirror shared by the tests.
//!
//! Every test builds its own [Fixture], so tests never share state.

use std::sync::MutexGuard;

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Client,
    account::Account,
    catalogue::{Site, SiteOrganization},
    config::QueryConfig,
    context::QueryContext,
    credential::Credential,
    database_id::{TransactionId, UserId},
    session::Session,
    transaction::{TimeWindow, Transaction, TransactionFilter},
    user::User,
};

/// Jan 1st 2017.
pub(crate) const FROM: i64 = 1_483_228_800;
/// Feb 1st 2017.
pub(crate) const TO: i64 = 1_485_907_200;
/// A quarter of January, so four of them tile the window.
pub(crate) const QUARTER_OF_JANUARY_SECONDS: i64 = 669_600;
/// The upstream ID of the tax authority site.
pub(crate) const SAT_ID_SITE: &str = "56cf5728784806f72b8b456f";
/// Keywords found in tax invoice transactions.
pub(crate) const KEYWORDS: [&str; 18] = [
    "3.2",
    "aerolineas",
    "cancelado",
    "cfdiregistrofiscal",
    "egreso",
    "emitidas",
    "ieps",
    "impuestoslocales",
    "informacionaduanera",
    "ingreso",
    "isr",
    "iva",
    "parte",
    "recibidas",
    "retenciones",
    "timbrefiscaldigital",
    "traslados",
    "vigente",
];

/// Transactions of the test user inside `(FROM, TO]`.
pub(crate) const IN_WINDOW_COUNT: u64 = 47;
/// All transactions of the test user.
pub(crate) const TOTAL_COUNT: u64 = 50;

const GENERATED_COUNT: i64 = 45;
const GENERATED_SPACING: i64 = 59_500;

const DESCRIPTIONS: [&str; 6] = [
    "CFDI 3.2 ingreso vigente IVA trasladado",
    "Egreso cancelado ISR retenciones",
    "Aerolineas emitidas IEPS",
    "Deposito de nomina",
    "Recibidas parte TimbreFiscalDigital",
    "Pago tarjeta de credito",
];

const REFERENCES: [&str; 4] = ["impuestoslocales", "informacionaduanera", "cfdiregistrofiscal", ""];

/// (account, credential, site, site organization) for each of the test user's accounts.
const ACCOUNTS: [(&str, &str, &str, &str); 4] = [
    ("acc-1", "cred-bank-1", "site-bank-1", "org-banks"),
    ("acc-2", "cred-bank-1", "site-bank-1", "org-banks"),
    ("acc-3", "cred-bank-2", "site-bank-2", "org-banks"),
    ("acc-4", "cred-sat", SAT_ID_SITE, "org-government"),
];

pub(crate) struct Fixture {
    pub client: Client,
    pub session: Session,
    pub id_user: UserId,
    pub other_id_user: UserId,
    pub window: TimeWindow,
    pub known_id_transaction: TransactionId,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();

        let connection = Connection::open_in_memory().unwrap();
        let client = Client::new(connection, QueryConfig::default()).unwrap();
        let id_user = "5a1f0c2b784806ab3e8b4567".to_owned();
        let other_id_user = "5a1f0c2b784806ab3e8b4568".to_owned();

        client
            .import_site_organizations(vec![
                organization("org-banks", "Banks"),
                organization("org-government", "Government"),
            ])
            .unwrap();
        client
            .import_sites(vec![
                site("site-bank-1", "org-banks", "Bank One"),
                site("site-bank-2", "org-banks", "Bank Two"),
                site("site-unused", "org-banks", "Bank Nobody Uses"),
                site(SAT_ID_SITE, "org-government", "SAT"),
            ])
            .unwrap();
        client
            .import_users(vec![
                User {
                    id_user: id_user.clone(),
                    name: "php_lib_test_user".to_owned(),
                },
                User {
                    id_user: other_id_user.clone(),
                    name: "someone_else".to_owned(),
                },
            ])
            .unwrap();
        client
            .import_credentials(vec![
                credential("cred-bank-1", &id_user, "site-bank-1"),
                credential("cred-bank-2", &id_user, "site-bank-2"),
                credential("cred-sat", &id_user, SAT_ID_SITE),
                credential("cred-b-bank-1", &other_id_user, "site-bank-1"),
            ])
            .unwrap();

        let mut accounts: Vec<Account> = ACCOUNTS
            .iter()
            .map(|(id_account, id_credential, id_site, _)| {
                account(id_account, &id_user, id_credential, id_site)
            })
            .collect();
        accounts.push(account("acc-b-1", &other_id_user, "cred-b-bank-1", "site-bank-1"));
        client.import_accounts(accounts).unwrap();

        client
            .import_transactions(seed_transactions(&id_user, &other_id_user))
            .unwrap();

        let session = client.create_session(&id_user).unwrap();
        let window = TimeWindow::between(timestamp(FROM), timestamp(TO)).unwrap();

        Self {
            client,
            session,
            id_user,
            other_id_user,
            window,
            known_id_transaction: "txn-000".to_owned(),
        }
    }

    /// The test user's session as a query context.
    pub fn context(&self) -> QueryContext {
        QueryContext::Session(self.session.clone())
    }

    /// A filter restricted to January 2017.
    pub fn window_filter(&self) -> TransactionFilter {
        TransactionFilter::default().window(self.window)
    }

    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.client.lock_for_test()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn timestamp(seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(seconds).unwrap()
}

fn organization(id: &str, name: &str) -> SiteOrganization {
    SiteOrganization {
        id_site_organization: id.to_owned(),
        name: name.to_owned(),
    }
}

fn site(id: &str, id_site_organization: &str, name: &str) -> Site {
    Site {
        id_site: id.to_owned(),
        id_site_organization: id_site_organization.to_owned(),
        name: name.to_owned(),
    }
}

fn credential(id: &str, id_user: &str, id_site: &str) -> Credential {
    Credential {
        id_credential: id.to_owned(),
        id_user: id_user.to_owned(),
        id_site: id_site.to_owned(),
        username: format!("login-{id}"),
    }
}

fn account(id: &str, id_user: &str, id_credential: &str, id_site: &str) -> Account {
    Account {
        id_account: id.to_owned(),
        id_user: id_user.to_owned(),
        id_credential: id_credential.to_owned(),
        id_site: id_site.to_owned(),
        name: format!("Account {id}"),
        balance: 1000.0,
        currency: "MXN".to_owned(),
    }
}

fn transaction(
    id: &str,
    id_user: &str,
    account_index: usize,
    dt: i64,
    description: &str,
    reference: &str,
) -> Transaction {
    let (id_account, id_credential, id_site, id_site_organization) = ACCOUNTS[account_index];

    Transaction {
        id_transaction: id.to_owned(),
        id_user: id_user.to_owned(),
        id_account: id_account.to_owned(),
        id_credential: id_credential.to_owned(),
        id_site: id_site.to_owned(),
        id_site_organization: id_site_organization.to_owned(),
        dt_transaction: timestamp(dt),
        description: description.to_owned(),
        reference: reference.to_owned(),
        amount: -100.0,
        currency: "MXN".to_owned(),
    }
}

fn seed_transactions(id_user: &str, other_id_user: &str) -> Vec<Transaction> {
    let mut transactions: Vec<Transaction> = (0..GENERATED_COUNT)
        .map(|i| {
            let index = i.unsigned_abs() as usize;
            transaction(
                &format!("txn-{i:03}"),
                id_user,
                index % ACCOUNTS.len(),
                FROM + 1 + i * GENERATED_SPACING,
                DESCRIPTIONS[index % DESCRIPTIONS.len()],
                REFERENCES[index % REFERENCES.len()],
            )
        })
        .collect();

    let spei = "Transferencia SPEI";
    transactions.extend([
        // Same timestamp as txn-010, so ordering has to fall back to the ID.
        transaction("txn-tie", id_user, 0, FROM + 1 + 10 * GENERATED_SPACING, spei, ""),
        transaction("txn-at-to", id_user, 1, TO, spei, ""),
        transaction("txn-at-from", id_user, 2, FROM, spei, ""),
        transaction("txn-december", id_user, 0, FROM - 86_400, spei, ""),
        transaction("txn-february", id_user, 3, TO + 86_400, spei, ""),
    ]);

    // Belong to another user and must never show up in the test user's results.
    transactions.extend((0..5).map(|i| {
        let mut other = transaction(
            &format!("txn-b-{i:03}"),
            other_id_user,
            0,
            FROM + 1 + i * 86_400,
            DESCRIPTIONS[0],
            "",
        );
        other.id_account = "acc-b-1".to_owned();
        other.id_credential = "cred-b-bank-1".to_owned();
        other
    }));

    transactions
}
