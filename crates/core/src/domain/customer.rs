use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    /// CPF or CNPJ as typed by the operator; formatting is not normalized.
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}
