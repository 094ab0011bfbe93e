//! Screen trait and screen identifier enum.

use std::fmt;

/// Identifies each primary screen, navigable by number keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenId {
    #[default]
    Dashboard, // 1
    Books,      // 2
    Borrowers,  // 3
    Loans,      // 4
    Products,   // 5
    Categories, // 6
    /// Login — not in the tab bar, entered on start and on any 401.
    Login,
}

impl ScreenId {
    /// All screens in tab-bar order.
    pub const ALL: [ScreenId; 6] = [
        Self::Dashboard,
        Self::Books,
        Self::Borrowers,
        Self::Loans,
        Self::Products,
        Self::Categories,
    ];

    /// Numeric key (1-6) for this screen. Login has no number key.
    pub fn number(self) -> u8 {
        match self {
            Self::Dashboard => 1,
            Self::Books => 2,
            Self::Borrowers => 3,
            Self::Loans => 4,
            Self::Products => 5,
            Self::Categories => 6,
            Self::Login => 0,
        }
    }

    /// Screen from a numeric key (1-6). Returns None for out-of-range.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Dashboard),
            2 => Some(Self::Books),
            3 => Some(Self::Borrowers),
            4 => Some(Self::Loans),
            5 => Some(Self::Products),
            6 => Some(Self::Categories),
            _ => None,
        }
    }

    /// Next screen in tab order (wraps around).
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Previous screen in tab order (wraps around).
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&s| s == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Label for the tab bar.
    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Books => "Books",
            Self::Borrowers => "Borrowers",
            Self::Loans => "Loans",
            Self::Products => "Products",
            Self::Categories => "Categories",
            Self::Login => "Login",
        }
    }

    /// Compact label for narrow terminals (< 100 cols).
    pub fn label_short(self) -> &'static str {
        match self {
            Self::Dashboard => "Dash",
            Self::Books => "Book",
            Self::Borrowers => "Borr",
            Self::Loans => "Loan",
            Self::Products => "Prod",
            Self::Categories => "Cat",
            Self::Login => "Login",
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
