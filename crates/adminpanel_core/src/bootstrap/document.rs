//! Seed document model and XML reader.

use super::SeedError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

const ROOT: &str = "bootstrap";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSeed {
    pub name: String,
    pub description: Option<String>,
    /// Grants every seeded menu to this role; defaults to `true`.
    pub grant_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSeed {
    pub name: String,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub order: i64,
    pub children: Vec<MenuSeed>,
}

impl MenuSeed {
    /// Number of menus in this subtree, itself included.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(MenuSeed::subtree_len).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSeed {
    pub login: String,
    pub name: String,
    pub password: String,
    pub role: Option<String>,
}

/// Everything one `<bootstrap>` element declares, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedDocument {
    pub roles: Vec<RoleSeed>,
    pub menus: Vec<MenuSeed>,
    pub users: Vec<UserSeed>,
}

impl SeedDocument {
    pub fn menu_count(&self) -> usize {
        self.menus.iter().map(MenuSeed::subtree_len).sum()
    }
}

/// Parses a seed document.
///
/// # Errors
/// - `Xml` for malformed XML, a wrong root, or an unexpected element.
/// - `MissingAttribute` / `InvalidAttribute` for bad element attributes.
pub fn parse_seed_document(xml: &str) -> Result<SeedDocument, SeedError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut document = SeedDocument::default();
    let mut open_menus: Vec<MenuSeed> = Vec::new();
    let mut seen_root = false;
    let mut root_closed = false;

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|err| SeedError::Xml {
            position,
            message: err.to_string(),
        })?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = element_name(e);
                if root_closed {
                    return Err(unexpected(position, &name, "after </bootstrap>"));
                }
                if !seen_root {
                    if name != ROOT {
                        return Err(unexpected(position, &name, "as document root"));
                    }
                    seen_root = true;
                    if is_empty {
                        root_closed = true;
                    }
                    continue;
                }
                match name.as_str() {
                    "role" if open_menus.is_empty() => {
                        document.roles.push(read_role(e, position)?);
                        skip_body(&mut reader, is_empty, "role")?;
                    }
                    "user" if open_menus.is_empty() => {
                        document.users.push(read_user(e, position)?);
                        skip_body(&mut reader, is_empty, "user")?;
                    }
                    "menu" => {
                        let menu = read_menu(e, position)?;
                        if is_empty {
                            attach_menu(&mut document, &mut open_menus, menu);
                        } else {
                            open_menus.push(menu);
                        }
                    }
                    other => return Err(unexpected(position, other, "inside <bootstrap>")),
                }
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == "menu" {
                    if let Some(menu) = open_menus.pop() {
                        attach_menu(&mut document, &mut open_menus, menu);
                    }
                } else if name == ROOT {
                    root_closed = true;
                }
            }
            Event::Text(ref text) if !text.is_empty() => {
                return Err(SeedError::Xml {
                    position,
                    message: "unexpected text content".to_string(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let position = reader.buffer_position();
    if !seen_root {
        return Err(SeedError::Xml {
            position,
            message: format!("missing <{ROOT}> root element"),
        });
    }
    if let Some(menu) = open_menus.last() {
        return Err(SeedError::Xml {
            position,
            message: format!("unclosed <menu name=\"{}\"> at end of document", menu.name),
        });
    }
    if !root_closed {
        return Err(SeedError::Xml {
            position,
            message: format!("unclosed <{ROOT}> at end of document"),
        });
    }
    Ok(document)
}

fn attach_menu(document: &mut SeedDocument, open_menus: &mut [MenuSeed], menu: MenuSeed) {
    match open_menus.last_mut() {
        Some(parent) => parent.children.push(menu),
        None => document.menus.push(menu),
    }
}

/// Consumes the body of a non-empty leaf element; leaf elements carry no content.
fn skip_body(
    reader: &mut Reader<&[u8]>,
    is_empty: bool,
    element: &'static str,
) -> Result<(), SeedError> {
    if is_empty {
        return Ok(());
    }
    let position = reader.buffer_position();
    match reader.read_event() {
        Ok(Event::End(ref e)) if e.name().as_ref() == element.as_bytes() => Ok(()),
        Ok(_) => Err(SeedError::Xml {
            position,
            message: format!("<{element}> must not have content"),
        }),
        Err(err) => Err(SeedError::Xml {
            position,
            message: err.to_string(),
        }),
    }
}

fn read_role(e: &BytesStart<'_>, position: usize) -> Result<RoleSeed, SeedError> {
    let mut attrs = Attributes::collect(e, position)?;
    let grant_all = match attrs.take("grant-all") {
        None => true,
        Some(value) => parse_flag("role", "grant-all", value)?,
    };
    Ok(RoleSeed {
        name: attrs.require("role", "name")?,
        description: attrs.take("description"),
        grant_all,
    })
}

fn read_menu(e: &BytesStart<'_>, position: usize) -> Result<MenuSeed, SeedError> {
    let mut attrs = Attributes::collect(e, position)?;
    let order = match attrs.take("order") {
        None => 0,
        Some(value) => value
            .trim()
            .parse::<i64>()
            .map_err(|_| SeedError::InvalidAttribute {
                element: "menu",
                attribute: "order",
                value,
            })?,
    };
    Ok(MenuSeed {
        name: attrs.require("menu", "name")?,
        url: attrs.take("url"),
        icon: attrs.take("icon"),
        order,
        children: Vec::new(),
    })
}

fn read_user(e: &BytesStart<'_>, position: usize) -> Result<UserSeed, SeedError> {
    let mut attrs = Attributes::collect(e, position)?;
    let login = attrs.require("user", "login")?;
    Ok(UserSeed {
        name: attrs.take("name").unwrap_or_else(|| login.clone()),
        password: attrs.require("user", "password")?,
        role: attrs.take("role"),
        login,
    })
}

fn parse_flag(
    element: &'static str,
    attribute: &'static str,
    value: String,
) -> Result<bool, SeedError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(SeedError::InvalidAttribute {
            element,
            attribute,
            value,
        }),
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn unexpected(position: usize, name: &str, context: &str) -> SeedError {
    SeedError::Xml {
        position,
        message: format!("unexpected element <{name}> {context}"),
    }
}

/// Unescaped attribute values of one element, consumed by name.
struct Attributes(Vec<(String, String)>);

impl Attributes {
    fn collect(e: &BytesStart<'_>, position: usize) -> Result<Self, SeedError> {
        let mut values = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| SeedError::Xml {
                position,
                message: err.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| SeedError::Xml {
                    position,
                    message: err.to_string(),
                })?
                .into_owned();
            values.push((key, value));
        }
        Ok(Self(values))
    }

    fn take(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(name, _)| name == key)?;
        Some(self.0.swap_remove(index).1)
    }

    fn require(
        &mut self,
        element: &'static str,
        attribute: &'static str,
    ) -> Result<String, SeedError> {
        self.take(attribute)
            .filter(|value| !value.trim().is_empty())
            .ok_or(SeedError::MissingAttribute { element, attribute })
    }
}
