use super::session::SessionHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Loading,
    RedirectToLogin,
    Render,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
}

pub const LOGIN_PATH: &str = "/login";

pub static NAV_ITEMS: [NavItem; 6] = [
    NavItem { label: "Overview", path: "/dashboard" },
    NavItem { label: "Transações", path: "/dashboard/transactions" },
    NavItem { label: "Categorias", path: "/dashboard/categories" },
    NavItem { label: "Projeções", path: "/dashboard/projections" },
    NavItem { label: "Upload", path: "/dashboard/upload" },
    NavItem { label: "Configurações", path: "/dashboard/settings" },
];

/// Layout wrapper. Nothing under it renders without a session.
#[derive(Debug, Clone)]
pub struct Shell {
    session: SessionHandle,
    restoring: bool,
}

impl Shell {
    pub fn new(session: SessionHandle) -> Self {
        Shell {
            session,
            restoring: false,
        }
    }

    /// Marks a session restore in flight, shown as `Gate::Loading`.
    pub fn set_restoring(&mut self, restoring: bool) {
        self.restoring = restoring;
    }

    pub async fn gate(&self) -> Gate {
        if self.restoring {
            Gate::Loading
        } else if self.session.is_authenticated().await {
            Gate::Render
        } else {
            Gate::RedirectToLogin
        }
    }

    pub fn nav(&self) -> &'static [NavItem] {
        &NAV_ITEMS
    }

    /// The most specific nav entry owning `path`.
    pub fn active(&self, path: &str) -> Option<&'static NavItem> {
        NAV_ITEMS
            .iter()
            .filter(|item| path == item.path || path.starts_with(&format!("{}/", item.path)))
            .max_by_key(|item| item.path.len())
    }

    pub async fn greeting(&self) -> Option<String> {
        let user = self.session.user().await?;
        Some(user.name.unwrap_or(user.email))
    }
}
