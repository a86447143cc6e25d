//! Applies a parsed seed document through the service layer.

use super::document::{parse_seed_document, MenuSeed, SeedDocument};
use super::SeedError;
use crate::model::menu::Menu;
use crate::service::menu_cache::MenuCache;
use crate::service::menu_service::MenuService;
use crate::service::user_service::{NewUser, UserService};
use crate::session::{EntityId, Session, TransactionMode};
use crate::util::compress::gunzip_bytes;
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Counts of records written by one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// The document was already applied; nothing was written.
    pub skipped: bool,
    pub roles: usize,
    pub menus: usize,
    pub grants: usize,
    pub users: usize,
}

/// Reads, parses and applies a seed file. Files ending in `.gz` are
/// decompressed first.
pub fn seed_from_file<S: Session>(
    session: &S,
    cache: &MenuCache,
    path: impl AsRef<Path>,
) -> Result<SeedReport, SeedError> {
    let path = path.as_ref();
    let xml = read_seed_file(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    seed_from_xml(session, cache, &xml)
}

fn read_seed_file(path: &Path) -> io::Result<String> {
    let raw = fs::read(path)?;
    let bytes = if path.extension().is_some_and(|ext| ext == "gz") {
        gunzip_bytes(&raw)?
    } else {
        raw
    };
    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

pub fn seed_from_xml<S: Session>(
    session: &S,
    cache: &MenuCache,
    xml: &str,
) -> Result<SeedReport, SeedError> {
    let document = parse_seed_document(xml)?;
    seed_document(session, cache, &document)
}

/// Applies `document` inside one read-write transaction.
///
/// The run is skipped when any seeded user login or role name already
/// exists. Any failure rolls back every write of the run.
pub fn seed_document<S: Session>(
    session: &S,
    cache: &MenuCache,
    document: &SeedDocument,
) -> Result<SeedReport, SeedError> {
    let result = session.in_transaction(TransactionMode::ReadWrite, |session| {
        apply_document(session, cache, document)
    });

    match &result {
        Ok(report) if report.skipped => info!(
            "event=bootstrap_seed module=bootstrap status=skipped reason=already_seeded"
        ),
        Ok(report) => info!(
            "event=bootstrap_seed module=bootstrap status=ok roles={} menus={} grants={} users={}",
            report.roles, report.menus, report.grants, report.users
        ),
        Err(err) => warn!(
            "event=bootstrap_seed module=bootstrap status=error error={}",
            err
        ),
    }
    result
}

fn apply_document<S: Session>(
    session: &S,
    cache: &MenuCache,
    document: &SeedDocument,
) -> Result<SeedReport, SeedError> {
    let users = UserService::new(session);
    let menus = MenuService::new(session, cache);

    if already_seeded(&users, document)? {
        return Ok(SeedReport {
            skipped: true,
            ..SeedReport::default()
        });
    }

    let mut report = SeedReport::default();
    let mut role_ids: BTreeMap<&str, EntityId> = BTreeMap::new();
    for seed in &document.roles {
        let role = users.create_role(&seed.name, seed.description.as_deref())?;
        if let Some(role_id) = role.id {
            role_ids.insert(seed.name.as_str(), role_id);
        }
        report.roles += 1;
    }

    let mut menu_ids = Vec::with_capacity(document.menu_count());
    for seed in &document.menus {
        create_menu_subtree(&menus, None, seed, &mut menu_ids)?;
    }
    report.menus = menu_ids.len();

    for seed in document.roles.iter().filter(|seed| seed.grant_all) {
        let Some(&role_id) = role_ids.get(seed.name.as_str()) else {
            continue;
        };
        for &menu_id in &menu_ids {
            if menus.grant_menu(role_id, menu_id)? {
                report.grants += 1;
            }
        }
    }

    for seed in &document.users {
        if let Some(role) = seed.role.as_deref() {
            if !role_ids.contains_key(role) && users.find_role_by_name(role)?.is_none() {
                return Err(SeedError::UnknownRole(role.to_string()));
            }
        }
        let mut request = NewUser::new(&seed.login, &seed.name, &seed.password);
        request.role = seed.role.clone();
        users.create_user(request)?;
        report.users += 1;
    }

    Ok(report)
}

fn already_seeded<S: Session>(
    users: &UserService<'_, S>,
    document: &SeedDocument,
) -> Result<bool, SeedError> {
    for seed in &document.users {
        if users.find_by_login(&seed.login)?.is_some() {
            return Ok(true);
        }
    }
    for seed in &document.roles {
        if users.find_role_by_name(&seed.name)?.is_some() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn create_menu_subtree<S: Session>(
    menus: &MenuService<'_, '_, S>,
    parent_id: Option<EntityId>,
    seed: &MenuSeed,
    created: &mut Vec<EntityId>,
) -> Result<(), SeedError> {
    let mut menu = Menu::new(parent_id, seed.name.as_str());
    menu.url = seed.url.clone();
    menu.icon = seed.icon.clone();
    menu.sort_order = seed.order;

    let menu = menus.create_menu(menu)?;
    let Some(menu_id) = menu.id else {
        return Ok(());
    };
    created.push(menu_id);
    for child in &seed.children {
        create_menu_subtree(menus, Some(menu_id), child, created)?;
    }
    Ok(())
}
