use cli_table::Table;

use authgate_core::authorization::AuthorizationView;
use authgate_core::connection::Connection;

#[derive(Table, Clone)]
pub(crate) struct ConnectionRow {
    #[table(title = "ID")]
    id: String,
    #[table(title = "Name")]
    name: String,
    #[table(title = "Base URL")]
    base_url: String,
    #[table(title = "Status")]
    status: String,
    #[table(title = "Created At")]
    created_at: String,
}

impl From<&Connection> for ConnectionRow {
    fn from(connection: &Connection) -> Self {
        let status = if connection.is_active() {
            "active"
        } else {
            "inactive"
        };

        Self {
            id: connection.id().to_string(),
            name: connection.name().to_string(),
            base_url: connection.base_url().to_string(),
            status: status.to_string(),
            created_at: connection.created_at().to_rfc3339(),
        }
    }
}

#[derive(Table, Clone)]
pub(crate) struct AuthorizationRow {
    #[table(title = "Connection")]
    connection: String,
    #[table(title = "ID")]
    id: String,
    #[table(title = "Title")]
    title: String,
    #[table(title = "State")]
    state: String,
    #[table(title = "Remaining")]
    remaining: String,
    #[table(title = "Progress")]
    progress: String,
}

impl From<&AuthorizationView> for AuthorizationRow {
    fn from(view: &AuthorizationView) -> Self {
        let authorization = view.authorization();
        Self {
            connection: authorization.connection_id().to_string(),
            id: authorization.id().to_string(),
            title: authorization.title().to_string(),
            state: format!("{:?}", view.state()),
            remaining: format!("{}s", view.remaining()),
            progress: format!("{:.0}%", view.progress() * 100.0),
        }
    }
}
