//! Custom menu management.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Operation, Result},
    transport::{ApiStatus, Transport},
};

const MAX_TOP_LEVEL_BUTTONS: usize = 3;
const MAX_SUB_BUTTONS: usize = 5;

/// The account's custom menu.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub button: Vec<MenuButton>,
}

/// A menu entry; either an action button or a parent holding `sub_button`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuButton {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagepath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_button: Vec<MenuButton>,
}

impl MenuButton {
    /// Button that pushes a `CLICK` event carrying `key`.
    pub fn click(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: Some("click".into()),
            name: name.into(),
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Button that opens `url`.
    pub fn view(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: Some("view".into()),
            name: name.into(),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Button that opens a mini program page; `url` is the fallback for old clients.
    pub fn mini_program(
        name: impl Into<String>,
        url: impl Into<String>,
        appid: impl Into<String>,
        pagepath: impl Into<String>,
    ) -> Self {
        Self {
            kind: Some("miniprogram".into()),
            name: name.into(),
            url: Some(url.into()),
            appid: Some(appid.into()),
            pagepath: Some(pagepath.into()),
            ..Self::default()
        }
    }

    /// Parent entry grouping `children`.
    pub fn parent(name: impl Into<String>, children: Vec<MenuButton>) -> Self {
        Self {
            name: name.into(),
            sub_button: children,
            ..Self::default()
        }
    }
}

impl Menu {
    pub fn new(button: Vec<MenuButton>) -> Self {
        Self { button }
    }

    /// Enforce the platform's 3 × 5 layout before sending.
    pub fn validate(&self) -> Result<()> {
        if self.button.is_empty() {
            return Err(Error::invalid_input("menu has no buttons"));
        }
        if self.button.len() > MAX_TOP_LEVEL_BUTTONS {
            return Err(Error::invalid_input(format!(
                "menu has {} top-level buttons, at most {MAX_TOP_LEVEL_BUTTONS} allowed",
                self.button.len()
            )));
        }
        for button in &self.button {
            if button.sub_button.len() > MAX_SUB_BUTTONS {
                return Err(Error::invalid_input(format!(
                    "menu entry '{}' has {} sub buttons, at most {MAX_SUB_BUTTONS} allowed",
                    button.name,
                    button.sub_button.len()
                )));
            }
            if button.kind.is_none() && button.sub_button.is_empty() {
                return Err(Error::invalid_input(format!(
                    "menu entry '{}' has neither a type nor sub buttons",
                    button.name
                )));
            }
        }
        Ok(())
    }
}

/// Replace the account's menu with `menu`.
pub async fn create_menu(transport: &Transport, access_token: &str, menu: &Menu) -> Result<()> {
    menu.validate()?;
    transport
        .post_json::<ApiStatus, _>(
            Operation::CreateMenu,
            "/cgi-bin/menu/create",
            &[("access_token", access_token)],
            menu,
        )
        .await?;
    Ok(())
}

/// Remove the account's custom menu.
pub async fn delete_menu(transport: &Transport, access_token: &str) -> Result<()> {
    transport
        .get_json::<ApiStatus>(Operation::DeleteMenu, "/cgi-bin/menu/delete", &[(
            "access_token",
            access_token,
        )])
        .await?;
    Ok(())
}
