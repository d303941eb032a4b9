use async_graphql::SimpleObject;
use products_hr::Session;

#[derive(Clone, Debug, SimpleObject)]
pub struct MePayload {
    pub username: String,
    pub role: String,
    pub is_hr: bool,
}

impl From<&Session> for MePayload {
    fn from(session: &Session) -> Self {
        Self {
            username: session.username.clone(),
            role: session.role.as_str().to_string(),
            is_hr: session.is_hr(),
        }
    }
}
