//! External collaborators of the route gate: the Supabase session store and the
//! Postgres role store, each behind a trait so tests can swap in fakes.

pub mod roles;
pub mod session;
pub mod supabase;

pub use roles::{PgRoleStore, RoleError, RoleStore};
pub use session::{
    CookieOptions, Principal, SessionError, SessionRefresh, SessionStore, cookie_value,
};
pub use supabase::SupabaseSessionStore;
