//! The site and site organization catalogues.
//!
//! Catalogues are shared by every user, unlike accounts and credentials.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    database_id::{SiteId, SiteOrganizationId},
};

/// An institution or service that credentials can be linked to, e.g. a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// The site's upstream ID.
    pub id_site: SiteId,
    /// The organization that runs the site.
    pub id_site_organization: SiteOrganizationId,
    /// Display name, e.g. "SAT".
    pub name: String,
}

/// The organization behind one or more sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteOrganization {
    /// The organization's upstream ID.
    pub id_site_organization: SiteOrganizationId,
    /// Display name.
    pub name: String,
}

/// Create the site organization and site tables.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_catalogue_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS site_organization (
                id_site_organization TEXT PRIMARY KEY,
                name TEXT NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS site (
                id_site TEXT PRIMARY KEY,
                id_site_organization TEXT NOT NULL,
                name TEXT NOT NULL,
                FOREIGN KEY(id_site_organization) REFERENCES site_organization(id_site_organization)
                    ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Insert upstream site organizations, skipping IDs already in the mirror.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if an SQL related error occurred.
pub fn import_site_organizations(
    organizations: Vec<SiteOrganization>,
    connection: &Connection,
) -> Result<Vec<SiteOrganization>, Error> {
    let mut stmt = connection.prepare(
        "INSERT INTO site_organization (id_site_organization, name) VALUES (?1, ?2)
         ON CONFLICT(id_site_organization) DO NOTHING",
    )?;

    let mut imported = Vec::new();
    for organization in organizations {
        if stmt.execute((&organization.id_site_organization, &organization.name))? == 1 {
            imported.push(organization);
        }
    }

    Ok(imported)
}

/// Insert upstream sites, skipping IDs already in the mirror.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if an SQL related error occurred,
/// including a site that refers to an unknown organization.
pub fn import_sites(sites: Vec<Site>, connection: &Connection) -> Result<Vec<Site>, Error> {
    let mut stmt = connection.prepare(
        "INSERT INTO site (id_site, id_site_organization, name) VALUES (?1, ?2, ?3)
         ON CONFLICT(id_site) DO NOTHING",
    )?;

    let mut imported = Vec::new();
    for site in sites {
        if stmt.execute((&site.id_site, &site.id_site_organization, &site.name))? == 1 {
            imported.push(site);
        }
    }

    Ok(imported)
}

/// Get every site in the catalogue, ordered by ID.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if the catalogue cannot be read.
pub fn get_sites(connection: &Connection) -> Result<Vec<Site>, Error> {
    connection
        .prepare("SELECT id_site, id_site_organization, name FROM site ORDER BY id_site ASC")?
        .query_map([], map_site_row)?
        .map(|maybe_site| maybe_site.map_err(Error::from))
        .collect()
}

/// Get every site organization in the catalogue, ordered by ID.
///
/// # Errors
///
/// Returns an [Error::UpstreamUnavailable] if the catalogue cannot be read.
pub fn get_site_organizations(connection: &Connection) -> Result<Vec<SiteOrganization>, Error> {
    connection
        .prepare(
            "SELECT id_site_organization, name FROM site_organization
             ORDER BY id_site_organization ASC",
        )?
        .query_map([], |row| {
            Ok(SiteOrganization {
                id_site_organization: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .map(|maybe_organization| maybe_organization.map_err(Error::from))
        .collect()
}

fn map_site_row(row: &Row) -> Result<Site, rusqlite::Error> {
    Ok(Site {
        id_site: row.get(0)?,
        id_site_organization: row.get(1)?,
        name: row.get(2)?,
    })
}
