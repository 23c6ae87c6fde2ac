//! crates/salbabida_core/src/accounts.rs
//!
//! Sign-up, sign-in and profile updates. Identity is delegated to the identity
//! provider; the `users` document carries the role and home address, and the
//! local preferences remember the session.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{info, warn};

use crate::domain::{Address, Preferences, UserProfile, UserRole};
use crate::geo::Coordinates;
use crate::ports::{
    Clock, GeocodingService, IdentityService, PortError, PortResult, UserDirectoryService,
};
use crate::preferences::PreferenceStore;
use crate::regions::DEFAULT_REGION;

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9+._%\-]{1,256}@[A-Za-z0-9][A-Za-z0-9\-]{0,64}(\.[A-Za-z0-9][A-Za-z0-9\-]{0,25})+$")
        .unwrap()
});

/// Either a GPS fix or a typed address must be supplied.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub gps_fix: Option<Coordinates>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub role: UserRole,
}

pub struct AccountService {
    identity: Arc<dyn IdentityService>,
    users: Arc<dyn UserDirectoryService>,
    geocoder: Arc<dyn GeocodingService>,
    preferences: Arc<PreferenceStore>,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        users: Arc<dyn UserDirectoryService>,
        geocoder: Arc<dyn GeocodingService>,
        preferences: Arc<PreferenceStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            users,
            geocoder,
            preferences,
            clock,
        }
    }

    /// Creates the account. The location is resolved before the identity is
    /// created, so an unresolvable address leaves no half-made account.
    pub async fn sign_up(&self, request: SignUpRequest) -> PortResult<Session> {
        let name = request.name.trim().to_string();
        let email = request.email.trim().to_string();
        validate_credentials(&name, &email, &request.password, &request.confirm_password)?;

        let (coordinates, address) = match (request.gps_fix, request.address) {
            (Some(fix), _) => {
                if !fix.is_valid() {
                    return Err(PortError::Validation(
                        "Unable to get GPS location. Try again or use manual address.".to_string(),
                    ));
                }
                (fix, None)
            }
            (None, Some(address)) => {
                let address = trimmed(address);
                if address.barangay.is_empty() || address.city.is_empty() || address.province.is_empty() {
                    return Err(PortError::Validation("Please fill in all address fields".to_string()));
                }
                let coordinates = match self.geocoder.geocode(&address.geocoding_query()).await {
                    Ok(Some(coordinates)) => coordinates,
                    Ok(None) => {
                        return Err(PortError::Validation(
                            "Address not found. Please check the details.".to_string(),
                        ))
                    }
                    Err(e) => {
                        warn!("Geocoding during sign-up failed: {}", e);
                        return Err(PortError::Validation(
                            "Unable to verify address. Please try again.".to_string(),
                        ));
                    }
                };
                (coordinates, Some(address))
            }
            (None, None) => {
                return Err(PortError::Validation(
                    "A GPS location or an address is required".to_string(),
                ))
            }
        };

        let user_id = self.identity.sign_up(&email, &request.password).await?;
        let profile = UserProfile {
            name,
            email,
            role: UserRole::User,
            barangay: address.as_ref().map(|a| a.barangay.clone()),
            city: address.as_ref().map(|a| a.city.clone()),
            province: address.as_ref().map(|a| a.province.clone()),
            latitude: Some(coordinates.latitude),
            longitude: Some(coordinates.longitude),
            created_at: self.clock.now(),
        };
        self.users.put_user(&user_id, &profile).await?;

        self.preferences
            .set_user_location(coordinates.latitude, coordinates.longitude)
            .await?;
        if let Some(address) = &address {
            self.preferences.set_user_address(address).await?;
        }
        self.preferences.start_session(&user_id, UserRole::User).await?;

        info!("Signed up user {}", user_id);
        Ok(Session {
            user_id,
            role: UserRole::User,
        })
    }

    /// Signs in and caches the role from the `users` document. A missing
    /// document or an unreachable directory means role "user".
    pub async fn sign_in(&self, email: &str, password: &str) -> PortResult<Session> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(PortError::Validation("Email and password are required".to_string()));
        }
        let user_id = self.identity.sign_in(email, password).await?;

        let role = match self.users.get_user(&user_id).await {
            Ok(Some(profile)) => profile.role,
            Ok(None) => UserRole::User,
            Err(e) => {
                warn!("Could not read the profile of {}, assuming role user: {}", user_id, e);
                UserRole::User
            }
        };
        self.preferences.start_session(&user_id, role).await?;

        info!("Signed in user {} as {}", user_id, role);
        Ok(Session { user_id, role })
    }

    pub async fn sign_out(&self) -> PortResult<()> {
        let prefs = self.preferences.load().await?;
        if let Some(user_id) = &prefs.session_user_id {
            if let Err(e) = self.identity.sign_out(user_id).await {
                warn!("Identity sign-out for {} failed: {}", user_id, e);
            }
        }
        self.preferences.clear_session().await
    }

    /// Stores the address, plus its coordinates when the geocoder finds them.
    /// Returns the coordinates that were stored, if any.
    pub async fn update_address(&self, address: Address) -> PortResult<Option<Coordinates>> {
        let address = trimmed(address);
        if address.barangay.is_empty() && address.city.is_empty() && address.province.is_empty() {
            return Err(PortError::Validation("Address is empty".to_string()));
        }

        let coordinates = match self.geocoder.geocode(&address.geocoding_query()).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Geocoding the updated address failed: {}", e);
                None
            }
        };

        self.preferences.set_user_address(&address).await?;
        if let Some(c) = coordinates {
            self.preferences.set_user_location(c.latitude, c.longitude).await?;
        }
        Ok(coordinates)
    }
}

/// What the weather screen calls the user's own location.
pub fn weather_label(prefs: &Preferences) -> String {
    let parts: Vec<&str> = [&prefs.user_barangay, &prefs.user_city, &prefs.user_province]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if !parts.is_empty() {
        return parts.join(", ");
    }
    if prefs.user_location.is_some() {
        return "Current Location".to_string();
    }
    prefs
        .selected_region
        .clone()
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

fn validate_credentials(name: &str, email: &str, password: &str, confirm: &str) -> PortResult<()> {
    let fail = |message: &str| Err(PortError::Validation(message.to_string()));
    if name.is_empty() {
        return fail("Name is required");
    }
    if email.is_empty() {
        return fail("Email is required");
    }
    if !EMAIL_PATTERN.is_match(email) {
        return fail("Invalid email format");
    }
    if password.trim().is_empty() {
        return fail("Password is required");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return fail("Password must be at least 6 characters");
    }
    if confirm != password {
        return fail("Passwords do not match");
    }
    Ok(())
}

fn trimmed(address: Address) -> Address {
    Address {
        barangay: address.barangay.trim().to_string(),
        city: address.city.trim().to_string(),
        province: address.province.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeGeocoder, FakeIdentity, FakeUserDirectory, FixedClock, InMemoryPreferences};

    struct Fixture {
        accounts: AccountService,
        identity: Arc<FakeIdentity>,
        users: Arc<FakeUserDirectory>,
        geocoder: Arc<FakeGeocoder>,
        prefs: Arc<PreferenceStore>,
    }

    fn fixture(geocoder: Arc<FakeGeocoder>) -> Fixture {
        let identity = Arc::new(FakeIdentity::default());
        let users = Arc::new(FakeUserDirectory::default());
        let prefs = Arc::new(PreferenceStore::new(Arc::new(InMemoryPreferences::default())));
        let accounts = AccountService::new(
            identity.clone(),
            users.clone(),
            geocoder.clone(),
            prefs.clone(),
            FixedClock::new(),
        );
        Fixture {
            accounts,
            identity,
            users,
            geocoder,
            prefs,
        }
    }

    fn address() -> Address {
        Address {
            barangay: " San Roque ".to_string(),
            city: "Legazpi".to_string(),
            province: "Albay".to_string(),
        }
    }

    fn request() -> SignUpRequest {
        SignUpRequest {
            name: "Maria Santos".to_string(),
            email: "maria@example.ph".to_string(),
            password: "bagyo2024".to_string(),
            confirm_password: "bagyo2024".to_string(),
            gps_fix: None,
            address: Some(address()),
        }
    }

    #[tokio::test]
    async fn sign_up_with_an_address_geocodes_and_stores_everything() {
        let f = fixture(FakeGeocoder::resolving(Coordinates::new(13.14, 123.74)));

        let session = f.accounts.sign_up(request()).await.unwrap();

        assert_eq!(session.role, UserRole::User);
        assert_eq!(
            f.geocoder.queries.lock().unwrap().as_slice(),
            ["San Roque, Legazpi, Albay, Philippines"]
        );
        let profile = f.users.users.lock().unwrap().get(&session.user_id).cloned().unwrap();
        assert_eq!(profile.role, UserRole::User);
        assert_eq!(profile.barangay.as_deref(), Some("San Roque"));
        assert_eq!(profile.latitude, Some(13.14));

        let prefs = f.prefs.load().await.unwrap();
        assert_eq!(prefs.user_location, Some(Coordinates::new(13.14, 123.74)));
        assert_eq!(prefs.user_city.as_deref(), Some("Legazpi"));
        assert_eq!(prefs.session_user_id, Some(session.user_id));
    }

    #[tokio::test]
    async fn sign_up_with_gps_skips_the_geocoder() {
        let f = fixture(Arc::new(FakeGeocoder::default()));
        let req = SignUpRequest {
            gps_fix: Some(Coordinates::new(13.62, 123.18)),
            address: None,
            ..request()
        };

        f.accounts.sign_up(req).await.unwrap();

        assert!(f.geocoder.queries.lock().unwrap().is_empty());
        let prefs = f.prefs.load().await.unwrap();
        assert_eq!(prefs.user_location, Some(Coordinates::new(13.62, 123.18)));
        assert!(prefs.user_barangay.is_none());
    }

    #[tokio::test]
    async fn credential_rules_are_enforced_in_order() {
        let f = fixture(FakeGeocoder::resolving(Coordinates::new(13.14, 123.74)));
        let cases = [
            (SignUpRequest { name: "  ".to_string(), ..request() }, "Name is required"),
            (SignUpRequest { email: "maria".to_string(), ..request() }, "Invalid email format"),
            (
                SignUpRequest { password: "abc".to_string(), confirm_password: "abc".to_string(), ..request() },
                "Password must be at least 6 characters",
            ),
            (SignUpRequest { confirm_password: "other1".to_string(), ..request() }, "Passwords do not match"),
            (
                SignUpRequest {
                    address: Some(Address { city: " ".to_string(), ..address() }),
                    ..request()
                },
                "Please fill in all address fields",
            ),
        ];

        for (req, expected) in cases {
            assert_eq!(
                f.accounts.sign_up(req).await.unwrap_err(),
                PortError::Validation(expected.to_string())
            );
        }
        assert!(f.identity.accounts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_address_creates_no_account() {
        let f = fixture(Arc::new(FakeGeocoder::default()));

        let err = f.accounts.sign_up(request()).await.unwrap_err();

        assert!(matches!(err, PortError::Validation(_)));
        assert!(f.identity.accounts.lock().unwrap().is_empty());

        *f.geocoder.fail.lock().unwrap() = true;
        let err = f.accounts.sign_up(request()).await.unwrap_err();
        assert_eq!(err, PortError::Validation("Unable to verify address. Please try again.".to_string()));
    }

    #[tokio::test]
    async fn sign_in_caches_the_stored_role() {
        let f = fixture(FakeGeocoder::resolving(Coordinates::new(13.14, 123.74)));
        let session = f.accounts.sign_up(request()).await.unwrap();
        f.accounts.sign_out().await.unwrap();
        f.users
            .users
            .lock()
            .unwrap()
            .get_mut(&session.user_id)
            .unwrap()
            .role = UserRole::Admin;

        let signed_in = f.accounts.sign_in("maria@example.ph", "bagyo2024").await.unwrap();

        assert_eq!(signed_in.role, UserRole::Admin);
        assert_eq!(f.prefs.role().await.unwrap(), UserRole::Admin);
    }

    #[tokio::test]
    async fn sign_in_defaults_to_user_when_the_directory_is_down() {
        let f = fixture(FakeGeocoder::resolving(Coordinates::new(13.14, 123.74)));
        f.accounts.sign_up(request()).await.unwrap();
        *f.users.fail.lock().unwrap() = true;

        let session = f.accounts.sign_in("maria@example.ph", "bagyo2024").await.unwrap();

        assert_eq!(session.role, UserRole::User);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let f = fixture(FakeGeocoder::resolving(Coordinates::new(13.14, 123.74)));
        f.accounts.sign_up(request()).await.unwrap();

        let err = f.accounts.sign_in("maria@example.ph", "wrong-pass").await.unwrap_err();

        assert!(matches!(err, PortError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn sign_out_forgets_the_session_and_role() {
        let f = fixture(FakeGeocoder::resolving(Coordinates::new(13.14, 123.74)));
        let session = f.accounts.sign_up(request()).await.unwrap();
        f.prefs.set_role(UserRole::Admin).await.unwrap();

        f.accounts.sign_out().await.unwrap();

        let prefs = f.prefs.load().await.unwrap();
        assert!(prefs.session_user_id.is_none());
        assert_eq!(prefs.role, UserRole::User);
        assert_eq!(f.identity.signed_out.lock().unwrap().as_slice(), [session.user_id]);
    }

    #[tokio::test]
    async fn address_update_keeps_text_when_geocoding_fails() {
        let f = fixture(Arc::new(FakeGeocoder::default()));
        *f.geocoder.fail.lock().unwrap() = true;

        let stored = f.accounts.update_address(address()).await.unwrap();

        assert_eq!(stored, None);
        let prefs = f.prefs.load().await.unwrap();
        assert_eq!(prefs.user_barangay.as_deref(), Some("San Roque"));
        assert!(prefs.user_location.is_none());
    }

    #[test]
    fn weather_label_prefers_address_then_location_then_region() {
        let mut prefs = Preferences::default();
        assert_eq!(weather_label(&prefs), "Camarines Sur");

        prefs.selected_region = Some("Albay".to_string());
        assert_eq!(weather_label(&prefs), "Albay");

        prefs.user_location = Some(Coordinates::new(13.1, 123.7));
        assert_eq!(weather_label(&prefs), "Current Location");

        prefs.user_city = Some("Legazpi".to_string());
        prefs.user_province = Some("Albay".to_string());
        assert_eq!(weather_label(&prefs), "Legazpi, Albay");
    }
}
