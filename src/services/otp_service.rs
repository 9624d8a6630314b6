// ============================================================================
// SERVICE OTP
// ============================================================================
//
// Flux de vérification d'email avant inscription:
//   1. send_code      → otp:<email> = code à 6 chiffres (10 min), envoyé par mail
//   2. verify_code    → consomme otp:<email>, pose verified:<email> (10 min)
//   3. is_verified    → vérifié par le signup
//   4. consume        → supprime verified:<email> une fois le compte créé
//
// Points d'attention:
//   - Les emails sont toujours normalisés en minuscules
//   - Le code n'apparaît jamais dans les logs
//
// ============================================================================

use std::time::Duration;

use rand::Rng;
use tracing::info;

use crate::error::ApiError;
use crate::services::mailer::Mailer;
use crate::services::otp_store::OtpStore;

pub const OTP_TTL: Duration = Duration::from_secs(600);
pub const VERIFIED_TTL: Duration = Duration::from_secs(600);

pub struct OtpService;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn otp_key(email: &str) -> String {
    format!("otp:{}", email)
}

fn verified_key(email: &str) -> String {
    format!("verified:{}", email)
}

/// Code aléatoire entre 100000 et 999999
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

impl OtpService {
    pub async fn send_code(
        store: &dyn OtpStore,
        mailer: &dyn Mailer,
        email: &str,
    ) -> Result<(), ApiError> {
        let email = normalize_email(email);
        let code = generate_code();

        // 1. Stocker le code (écrase un code précédent)
        store.set_ex(&otp_key(&email), &code, OTP_TTL).await?;

        // 2. Envoyer le mail
        mailer
            .send(
                &email,
                "Your OTP Code",
                &format!("Your verification code is {}", code),
            )
            .await?;

        info!(email = %email, "OTP sent");
        Ok(())
    }

    pub async fn verify_code(store: &dyn OtpStore, email: &str, code: &str) -> Result<(), ApiError> {
        let email = normalize_email(email);

        // Comparaison + suppression atomiques: un code n'est accepté qu'une fois
        let accepted = store.take_if_eq(&otp_key(&email), code.trim()).await?;
        if !accepted {
            return Err(ApiError::BadRequest("Invalid or expired OTP".to_string()));
        }

        store.set_ex(&verified_key(&email), "true", VERIFIED_TTL).await?;

        info!(email = %email, "OTP verified");
        Ok(())
    }

    pub async fn is_verified(store: &dyn OtpStore, email: &str) -> Result<bool, ApiError> {
        let value = store.get(&verified_key(&normalize_email(email))).await?;
        Ok(value.as_deref() == Some("true"))
    }

    pub async fn consume(store: &dyn OtpStore, email: &str) -> Result<(), ApiError> {
        store.del(&verified_key(&normalize_email(email))).await
    }
}
