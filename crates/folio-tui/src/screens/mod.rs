//! Screen components.
//!
//! Four of the six screens are instantiations of the one generic
//! [`resource::ResourceScreen`]; only loans, login, and the dashboard
//! carry their own code.

pub mod dashboard;
pub mod loans;
pub mod login;
pub mod resource;

use folio_core::{ApiClient, LoanController, TableController, books, borrowers, categories, products};

use crate::component::Component;
use crate::screen::ScreenId;

/// Build every screen plus the controllers the bridge needs to wire up.
pub fn create_screens(
    client: &ApiClient,
) -> (
    Vec<(ScreenId, Box<dyn Component>)>,
    Vec<(ScreenId, TableController)>,
    LoanController,
) {
    let tables = vec![
        (ScreenId::Books, TableController::new(client.clone(), books())),
        (
            ScreenId::Borrowers,
            TableController::new(client.clone(), borrowers()),
        ),
        (
            ScreenId::Products,
            TableController::new(client.clone(), products()),
        ),
        (
            ScreenId::Categories,
            TableController::new(client.clone(), categories()),
        ),
    ];
    let loans = LoanController::new(client.clone());

    let mut screens: Vec<(ScreenId, Box<dyn Component>)> = vec![(
        ScreenId::Dashboard,
        Box::new(dashboard::DashboardScreen::new(client.clone())),
    )];
    for (id, table) in &tables {
        screens.push((
            *id,
            Box::new(resource::ResourceScreen::new(*id, table.clone())),
        ));
    }
    screens.push((
        ScreenId::Loans,
        Box::new(loans::LoansScreen::new(loans.clone())),
    ));
    screens.push((
        ScreenId::Login,
        Box::new(login::LoginScreen::new(client.clone())),
    ));

    (screens, tables, loans)
}
