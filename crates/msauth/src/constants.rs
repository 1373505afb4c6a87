//! Microsoft identity platform endpoints
//!
//! Authorization server base URLs for the public and sovereign clouds. The
//! token endpoint for a tenant is `{endpoint}/{tenant_id}/oauth2/token`.

use serde::Deserialize;

/// Global Azure AD authentication endpoint
pub const AZURE_AD_AUTH_ENDPOINT_GLOBAL: &str = "https://login.microsoftonline.com";

/// Azure AD Germany authentication endpoint
pub const AZURE_AD_AUTH_ENDPOINT_GERMANY: &str = "https://login.microsoftonline.de";

/// Azure AD US Government authentication endpoint
pub const AZURE_AD_AUTH_ENDPOINT_US_GOV: &str = "https://login.microsoftonline.us";

/// Azure AD China (operated by 21Vianet) authentication endpoint
pub const AZURE_AD_AUTH_ENDPOINT_CHINA: &str = "https://login.partner.microsoftonline.cn";

/// Graph API version commonly paired with these endpoints
pub const API_VERSION: &str = "v1.0";

/// Named cloud whose authentication endpoint should be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cloud {
    #[default]
    Global,
    Germany,
    UsGov,
    China,
}

impl Cloud {
    /// Authentication endpoint base URL for this cloud.
    pub fn auth_endpoint(self) -> &'static str {
        match self {
            Cloud::Global => AZURE_AD_AUTH_ENDPOINT_GLOBAL,
            Cloud::Germany => AZURE_AD_AUTH_ENDPOINT_GERMANY,
            Cloud::UsGov => AZURE_AD_AUTH_ENDPOINT_US_GOV,
            Cloud::China => AZURE_AD_AUTH_ENDPOINT_CHINA,
        }
    }
}
