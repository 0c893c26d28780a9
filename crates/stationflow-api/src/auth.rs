// Authentication endpoints
//
// Sign-in returns a JWT which the caller installs with `set_token`; this
// module never stores it on its own.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::StationApiClient;
use crate::error::Error;
use crate::models::{ChangePasswordBody, JwtResponse, MessageResponse, SignInBody, SignUpBody};

impl StationApiClient {
    /// Exchange credentials for a JWT.
    ///
    /// `POST /auth/signin`. A 401 here means bad credentials, not an
    /// expired session, so it maps to [`Error::Authentication`].
    pub async fn sign_in(&self, username: &str, password: &SecretString) -> Result<JwtResponse, Error> {
        debug!(username, "signing in");
        let body = SignInBody {
            username,
            password: password.expose_secret(),
        };
        match self.post("auth/signin", &body).await {
            Err(Error::Unauthorized) => Err(Error::Authentication {
                message: "invalid username or password".into(),
            }),
            other => other,
        }
    }

    /// Register a new user account with the `user` role.
    ///
    /// `POST /auth/signup`
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &SecretString,
        captcha_token: &str,
    ) -> Result<MessageResponse, Error> {
        let body = SignUpBody {
            username,
            email,
            password: password.expose_secret(),
            role: ["user"],
            recaptcha_token: captcha_token,
        };
        self.post("auth/signup", &body).await
    }

    /// `POST /auth/change-password` (requires a session)
    pub async fn change_password(
        &self,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<MessageResponse, Error> {
        let body = ChangePasswordBody {
            current_password: current.expose_secret(),
            new_password: new.expose_secret(),
        };
        self.post("auth/change-password", &body).await
    }
}
