//! The shared portal session and its scripted operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use voterflow_core_types::{
    LoginOutcome, RegistrationOutcome, RegistrationPayload, SearchOutcome, StatusOutcome,
};

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::extract;
use crate::selectors as sel;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Seam between the conversational agent and the portal automation.
///
/// Every operation resolves to an outcome struct; automation failures are
/// classified into `success: false` messages rather than surfaced as
/// errors, so callers can hand the text straight back to the model.
#[async_trait]
pub trait Portal: Send + Sync {
    async fn login_or_signup(&self, email: &str, password: &str, mobile: &str) -> LoginOutcome;
    async fn submit_registration(&self, payload: &RegistrationPayload) -> RegistrationOutcome;
    async fn check_status(&self, application_id: &str) -> StatusOutcome;
    async fn search_voter(&self, voter_id: &str) -> SearchOutcome;
    async fn is_logged_in(&self) -> bool;
    async fn close(&self);
}

pub type SharedPortal = Arc<dyn Portal>;

#[derive(Default)]
struct SessionState {
    browser: Option<Browser>,
    page: Option<Page>,
    logged_in: bool,
}

/// One Chromium session shared by the whole process.
///
/// State lives behind a `Mutex` so operations are serialized; the portal
/// front-end keeps per-tab state and cannot be driven concurrently. The
/// browser and page are created lazily on the first operation that needs
/// them, so guard failures never spawn a browser.
pub struct PortalSession {
    config: PortalConfig,
    http: reqwest::Client,
    state: Mutex<SessionState>,
    alive: Arc<AtomicBool>,
}

impl PortalSession {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            state: Mutex::new(SessionState::default()),
            alive: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drop the session when the handler loop has ended underneath us.
    fn reconcile(&self, state: &mut SessionState) {
        if state.browser.is_some() && !self.alive.load(Ordering::SeqCst) {
            warn!("browser handler ended, dropping stale session");
            state.browser = None;
            state.page = None;
            state.logged_in = false;
        }
    }

    async fn ensure_page(&self, state: &mut SessionState) -> Result<Page, PortalError> {
        if let Some(page) = state.page.as_ref() {
            return Ok(page.clone());
        }

        info!(headless = self.config.headless, "launching browser");
        let mut builder = BrowserConfig::builder()
            .window_size(self.config.viewport.0, self.config.viewport.1)
            .no_sandbox();
        if !self.config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(PortalError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;
        self.alive.store(true, Ordering::SeqCst);
        let alive = Arc::clone(&self.alive);
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            alive.store(false, Ordering::SeqCst);
            debug!("browser handler loop ended");
        });

        let page = browser.new_page("about:blank").await?;
        page.set_user_agent(self.config.user_agent.as_str()).await?;

        state.browser = Some(browser);
        state.page = Some(page.clone());
        Ok(page)
    }

    // -- DOM helpers ------------------------------------------------------

    async fn eval_bool(&self, page: &Page, expr: String) -> Result<bool, PortalError> {
        let result = page.evaluate(expr).await?;
        Ok(result.into_value::<bool>().unwrap_or(false))
    }

    async fn eval_text(&self, page: &Page, expr: String) -> Result<Option<String>, PortalError> {
        let result = page.evaluate(expr).await?;
        Ok(result.into_value::<Option<String>>().unwrap_or(None))
    }

    async fn element_exists(&self, page: &Page, selector: &str) -> Result<bool, PortalError> {
        let expr = format!(
            "!!document.querySelector({sel})",
            sel = js_quote(selector)
        );
        self.eval_bool(page, expr).await
    }

    /// Present and not `display: none`, matching how the portal toggles
    /// its views.
    async fn is_displayed(&self, page: &Page, selector: &str) -> Result<bool, PortalError> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return !!(el && window.getComputedStyle(el).display !== 'none'); }})()",
            sel = js_quote(selector)
        );
        self.eval_bool(page, expr).await
    }

    async fn has_class(
        &self,
        page: &Page,
        selector: &str,
        class: &str,
    ) -> Result<bool, PortalError> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return !!(el && el.classList.contains({class})); }})()",
            sel = js_quote(selector),
            class = js_quote(class)
        );
        self.eval_bool(page, expr).await
    }

    async fn element_text(
        &self,
        page: &Page,
        selector: &str,
    ) -> Result<Option<String>, PortalError> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return el ? el.textContent : null; }})()",
            sel = js_quote(selector)
        );
        self.eval_text(page, expr).await
    }

    async fn wait_for_element(
        &self,
        page: &Page,
        selector: &str,
        wait: Duration,
    ) -> Result<(), PortalError> {
        let deadline = Instant::now() + wait;
        loop {
            if self.element_exists(page, selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PortalError::timeout(selector, wait));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_displayed(
        &self,
        page: &Page,
        selector: &str,
        wait: Duration,
    ) -> Result<(), PortalError> {
        let deadline = Instant::now() + wait;
        loop {
            if self.is_displayed(page, selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PortalError::timeout(selector, wait));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_class(
        &self,
        page: &Page,
        selector: &str,
        class: &str,
        wait: Duration,
    ) -> Result<(), PortalError> {
        let deadline = Instant::now() + wait;
        loop {
            if self.has_class(page, selector, class).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PortalError::timeout(
                    format!("{selector}.{class}"),
                    wait,
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Clear the field, then type with real keystrokes so the portal's
    /// input listeners fire.
    async fn clear_and_type(
        &self,
        page: &Page,
        selector: &str,
        text: &str,
    ) -> Result<(), PortalError> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); if (el) el.value = ''; }})()",
            sel = js_quote(selector)
        );
        page.evaluate(expr).await?;
        let element = page.find_element(selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    /// Assign the value directly and dispatch a synthetic input event.
    /// Used where keystroke simulation is unreliable (the OTP field).
    async fn set_value_with_input(
        &self,
        page: &Page,
        selector: &str,
        value: &str,
    ) -> Result<(), PortalError> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); if (el) {{ \
             el.value = ''; el.value = {value}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); }} }})()",
            sel = js_quote(selector),
            value = js_quote(value)
        );
        page.evaluate(expr).await?;
        Ok(())
    }

    async fn submit_form(&self, page: &Page, form_selector: &str) -> Result<(), PortalError> {
        let button = format!("{form_selector} button[type=\"submit\"]");
        let element = page.find_element(button).await?;
        element.click().await?;
        Ok(())
    }

    async fn app_visible(&self, page: &Page) -> Result<bool, PortalError> {
        self.is_displayed(page, sel::APP_CONTAINER).await
    }

    /// Full-page screenshot plus HTML length, logged on failures. Best
    /// effort only; diagnostics never mask the original failure.
    async fn capture_diagnostics(&self, state: &SessionState, op: &str) {
        let Some(page) = state.page.as_ref() else {
            return;
        };
        if let Err(err) = self.try_capture(page, op).await {
            warn!(error = %err, op, "diagnostics capture failed");
        }
    }

    async fn try_capture(&self, page: &Page, op: &str) -> Result<(), PortalError> {
        tokio::fs::create_dir_all(&self.config.screenshot_dir).await?;
        let path = self.config.screenshot_dir.join(format!(
            "{op}-{}.png",
            chrono::Utc::now().timestamp_millis()
        ));
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        let bytes = page.screenshot(params).await?;
        tokio::fs::write(&path, bytes).await?;

        let html_len = page
            .evaluate("document.documentElement.outerHTML.length")
            .await?
            .into_value::<u64>()
            .unwrap_or(0);
        warn!(screenshot = %path.display(), html_len, op, "captured failure diagnostics");
        Ok(())
    }

    // -- flows ------------------------------------------------------------

    async fn login_inner(
        &self,
        state: &mut SessionState,
        email: &str,
        password: &str,
        mobile: &str,
    ) -> Result<LoginOutcome, PortalError> {
        let page = self.ensure_page(state).await?;
        info!(email, "starting login/signup");

        page.goto(self.config.base_url.as_str()).await?;
        sleep(self.config.settle_after_nav).await;

        if self.app_visible(&page).await? {
            info!("session already authenticated on page");
            state.logged_in = true;
            return Ok(LoginOutcome::ok("Already logged in."));
        }

        self.wait_for_element(&page, sel::AUTH_CONTAINER, self.config.element_wait)
            .await?;
        self.wait_for_element(&page, sel::LOGIN_EMAIL, self.config.element_wait)
            .await?;

        self.clear_and_type(&page, sel::LOGIN_EMAIL, email).await?;
        self.clear_and_type(&page, sel::LOGIN_PASSWORD, password)
            .await?;
        self.submit_form(&page, sel::LOGIN_FORM).await?;
        sleep(self.config.settle_after_submit).await;

        if self.app_visible(&page).await? {
            info!("login succeeded");
            state.logged_in = true;
            return Ok(LoginOutcome::ok("Logged in successfully."));
        }

        let login_error = self
            .element_text(&page, sel::LOGIN_RESPONSE)
            .await?
            .unwrap_or_default();
        if login_error.to_lowercase().contains("invalid") {
            info!("credentials rejected, creating an account instead");
        } else {
            info!("login did not complete, creating an account instead");
        }

        self.signup(state, &page, email, password, mobile).await
    }

    async fn signup(
        &self,
        state: &mut SessionState,
        page: &Page,
        email: &str,
        password: &str,
        mobile: &str,
    ) -> Result<LoginOutcome, PortalError> {
        self.wait_for_element(page, sel::SHOW_SIGNUP, Duration::from_secs(5))
            .await?;
        page.find_element(sel::SHOW_SIGNUP).await?.click().await?;
        sleep(Duration::from_millis(1500)).await;
        self.wait_displayed(page, sel::SIGNUP_VIEW, Duration::from_secs(5))
            .await?;

        info!(mobile, "requesting OTP");
        self.clear_and_type(page, sel::SIGNUP_MOBILE, mobile).await?;
        self.submit_form(page, sel::OTP_SEND_FORM).await?;

        let deadline = Instant::now() + self.config.otp_wait;
        let otp_text = loop {
            if self.is_displayed(page, sel::OTP_RESPONSE).await? {
                if let Some(text) = self.element_text(page, sel::OTP_RESPONSE).await? {
                    if !text.trim().is_empty() {
                        break text;
                    }
                }
            }
            if Instant::now() >= deadline {
                return Err(PortalError::timeout("OTP response", self.config.otp_wait));
            }
            sleep(POLL_INTERVAL).await;
        };

        if !self
            .has_class(page, sel::OTP_RESPONSE, sel::CLASS_SUCCESS)
            .await?
        {
            return Err(PortalError::Rejected(format!(
                "OTP send failed: {}",
                otp_text.trim()
            )));
        }

        let otp = extract::extract_otp(&otp_text)
            .ok_or_else(|| PortalError::extraction("a 6-digit OTP code"))?;
        debug!("OTP extracted from the portal response");

        self.wait_displayed(page, sel::OTP_VERIFY_FORM, self.config.element_wait)
            .await?;
        self.set_value_with_input(page, sel::SIGNUP_OTP, &otp).await?;
        sleep(Duration::from_millis(500)).await;
        self.submit_form(page, sel::OTP_VERIFY_FORM).await?;

        self.wait_displayed(page, sel::SIGNUP_PHASE_2, Duration::from_secs(15))
            .await?;
        self.clear_and_type(page, sel::SIGNUP_EMAIL, email).await?;
        self.clear_and_type(page, sel::SIGNUP_PASSWORD, password)
            .await?;
        self.submit_form(page, sel::SIGNUP_FORM).await?;
        sleep(self.config.settle_after_submit).await;

        if !self.app_visible(page).await? {
            let signup_error = self
                .element_text(page, sel::SIGNUP_RESPONSE)
                .await?
                .unwrap_or_default();
            if !signup_error.trim().is_empty() {
                return Err(PortalError::Rejected(format!(
                    "Signup failed: {}",
                    signup_error.trim()
                )));
            }
            return Err(PortalError::Rejected(
                "Signup completed but login failed".to_string(),
            ));
        }

        info!("signup and login succeeded");
        state.logged_in = true;
        Ok(LoginOutcome::ok(
            "Account created and logged in successfully.",
        ))
    }

    async fn registration_inner(
        &self,
        state: &mut SessionState,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationOutcome, PortalError> {
        let page = self.ensure_page(state).await?;
        info!(full_name = %payload.full_name, "submitting voter registration");

        page.goto(self.config.base_url.as_str()).await?;
        sleep(Duration::from_secs(1)).await;

        if !self.app_visible(&page).await? {
            state.logged_in = false;
            return Ok(RegistrationOutcome::failed(
                "Session expired. Please login again.",
            ));
        }

        page.find_element(sel::REGISTER_TAB_BTN)
            .await?
            .click()
            .await?;
        sleep(Duration::from_secs(1)).await;
        self.wait_for_element(&page, sel::AADHAAR, self.config.element_wait)
            .await?;

        self.clear_and_type(&page, sel::AADHAAR, &payload.aadhaar)
            .await?;
        self.submit_form(&page, sel::AADHAAR_FORM).await?;
        self.wait_displayed(&page, sel::REGISTRATION_STEP, Duration::from_secs(15))
            .await?;
        sleep(Duration::from_millis(500)).await;

        self.bulk_fill(&page, payload).await?;
        sleep(Duration::from_millis(300)).await;

        // These fields have listeners that only settle on real keystrokes.
        for (selector, value) in [
            ("#fatherName", payload.father_name.as_str()),
            ("#state", payload.state.as_str()),
            ("#district", payload.district.as_str()),
        ] {
            if self.element_exists(&page, selector).await? {
                self.clear_and_type(&page, selector, value).await?;
            }
        }
        sleep(Duration::from_millis(500)).await;

        self.submit_form(&page, sel::REGISTRATION_FORM).await?;
        sleep(Duration::from_secs(2)).await;
        self.wait_for_class(
            &page,
            sel::REGISTRATION_RESPONSE,
            sel::CLASS_SHOW,
            self.config.response_wait,
        )
        .await?;

        let text = self
            .element_text(&page, sel::REGISTRATION_RESPONSE)
            .await?
            .unwrap_or_default();
        let success = self
            .has_class(&page, sel::REGISTRATION_RESPONSE, sel::CLASS_SUCCESS)
            .await?;

        let application_id = extract::extract_application_id(&text);
        let voter_id = extract::extract_voter_id(&text);
        if let Some(id) = voter_id.as_deref() {
            info!(voter_id = id, "voter id extracted from response");
        }

        Ok(RegistrationOutcome {
            success,
            message: text,
            application_id,
            voter_id,
        })
    }

    async fn bulk_fill(
        &self,
        page: &Page,
        payload: &RegistrationPayload,
    ) -> Result<(), PortalError> {
        let fields = json!({
            "fullName": payload.full_name,
            "fatherName": payload.father_name,
            "dob": payload.dob,
            "gender": payload.gender,
            "email": payload.email,
            "mobile": payload.mobile,
            "address": payload.address,
            "state": payload.state,
            "district": payload.district,
        });
        let expr = format!(
            "(() => {{ const fields = {fields}; \
             for (const [key, value] of Object.entries(fields)) {{ \
               const el = document.getElementById(key); \
               if (!el) continue; \
               el.value = value; \
               el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
               el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             }} }})()"
        );
        page.evaluate(expr).await?;
        Ok(())
    }

    async fn status_inner(
        &self,
        state: &mut SessionState,
        application_id: &str,
    ) -> Result<StatusOutcome, PortalError> {
        let page = self.ensure_page(state).await?;
        info!(application_id, "checking application status");

        page.goto(self.config.base_url.as_str()).await?;
        self.wait_for_element(&page, sel::APP_CONTAINER, self.config.element_wait)
            .await?;

        page.find_element(sel::STATUS_TAB_BTN).await?.click().await?;
        self.wait_for_element(&page, sel::STATUS_FORM, self.config.element_wait)
            .await?;

        self.clear_and_type(&page, sel::APPLICATION_ID, application_id)
            .await?;
        self.submit_form(&page, sel::STATUS_FORM).await?;
        self.wait_for_class(
            &page,
            sel::STATUS_RESPONSE,
            sel::CLASS_SHOW,
            self.config.response_wait,
        )
        .await?;
        // The panel renders its JSON a beat after the show class lands.
        sleep(Duration::from_secs(1)).await;

        let text = self
            .element_text(&page, sel::STATUS_RESPONSE)
            .await?
            .unwrap_or_default();
        let success = self
            .has_class(&page, sel::STATUS_RESPONSE, sel::CLASS_SUCCESS)
            .await?;

        let data = extract::parse_status(application_id, &text);
        Ok(StatusOutcome {
            success,
            message: text,
            data: Some(data),
        })
    }

    async fn search_via_ui(
        &self,
        state: &mut SessionState,
        voter_id: &str,
    ) -> Result<SearchOutcome, PortalError> {
        let page = self.ensure_page(state).await?;

        page.goto(self.config.base_url.as_str()).await?;
        self.wait_for_element(&page, sel::APP_CONTAINER, self.config.element_wait)
            .await?;

        page.find_element(sel::SEARCH_TAB_BTN).await?.click().await?;
        self.wait_for_element(&page, sel::SEARCH_FORM, self.config.element_wait)
            .await?;

        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); if (el) {{ \
             el.value = 'voterId'; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); }} }})()",
            sel = js_quote(sel::SEARCH_TYPE)
        );
        page.evaluate(expr).await?;

        self.clear_and_type(&page, sel::SEARCH_VOTER_ID, voter_id)
            .await?;
        self.submit_form(&page, sel::SEARCH_FORM).await?;
        self.wait_for_class(
            &page,
            sel::SEARCH_RESPONSE,
            sel::CLASS_SHOW,
            self.config.element_wait,
        )
        .await?;

        let text = self
            .element_text(&page, sel::SEARCH_RESPONSE)
            .await?
            .unwrap_or_default();
        Ok(SearchOutcome {
            success: true,
            message: text.clone(),
            data: Some(json!({ "voterId": voter_id, "info": text })),
        })
    }

    async fn search_via_api(&self, voter_id: &str) -> Result<SearchOutcome, PortalError> {
        let url = format!("{}{}", self.config.base_url, sel::SEARCH_ENDPOINT);
        let response = self
            .http
            .get(&url)
            .query(&[("voterId", voter_id)])
            .timeout(Duration::from_secs(10))
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;

        let records = body["data"].as_array();
        let found = body["success"].as_bool().unwrap_or(false)
            && records.map(|r| !r.is_empty()).unwrap_or(false);
        if !found {
            return Ok(SearchOutcome::failed("Voter not found"));
        }

        let record = records
            .and_then(|r| r.first())
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let name = record["fullName"].as_str().unwrap_or("unknown").to_string();
        Ok(SearchOutcome {
            success: true,
            message: format!("Found voter: {name}"),
            data: Some(record),
        })
    }

    #[cfg(test)]
    async fn force_logged_in(&self) {
        self.state.lock().await.logged_in = true;
    }
}

#[async_trait]
impl Portal for PortalSession {
    async fn login_or_signup(&self, email: &str, password: &str, mobile: &str) -> LoginOutcome {
        let mut state = self.state.lock().await;
        self.reconcile(&mut state);
        if state.logged_in {
            debug!("already logged in, skipping login/signup");
            return LoginOutcome::ok("Already logged in.");
        }

        let result = timeout(
            self.config.op_timeout,
            self.login_inner(&mut state, email, password, mobile),
        )
        .await;
        match flatten(result, "login", self.config.op_timeout) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "login/signup failed");
                state.logged_in = false;
                self.capture_diagnostics(&state, "login").await;
                LoginOutcome::failed(format!("Login/signup failed: {}", err.user_message()))
            }
        }
    }

    async fn submit_registration(&self, payload: &RegistrationPayload) -> RegistrationOutcome {
        let mut state = self.state.lock().await;
        self.reconcile(&mut state);
        if !state.logged_in {
            return RegistrationOutcome::failed(
                "You must be logged in to register. Please login first.",
            );
        }
        let missing = payload.empty_fields();
        if !missing.is_empty() {
            return RegistrationOutcome::failed(format!(
                "Missing required fields: {}",
                missing.join(", ")
            ));
        }

        let result = timeout(
            self.config.op_timeout,
            self.registration_inner(&mut state, payload),
        )
        .await;
        match flatten(result, "registration", self.config.op_timeout) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "registration failed");
                state.logged_in = false;
                self.capture_diagnostics(&state, "registration").await;
                RegistrationOutcome::failed(format!(
                    "Registration automation failed: {}",
                    err.user_message()
                ))
            }
        }
    }

    async fn check_status(&self, application_id: &str) -> StatusOutcome {
        let mut state = self.state.lock().await;
        self.reconcile(&mut state);
        if !state.logged_in {
            return StatusOutcome::failed("Not logged in. Please login first to check status.");
        }

        let result = timeout(
            self.config.op_timeout,
            self.status_inner(&mut state, application_id),
        )
        .await;
        match flatten(result, "status check", self.config.op_timeout) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "status check failed");
                state.logged_in = false;
                self.capture_diagnostics(&state, "status").await;
                StatusOutcome::failed(format!("Failed to check status: {}", err.user_message()))
            }
        }
    }

    async fn search_voter(&self, voter_id: &str) -> SearchOutcome {
        info!(voter_id, "searching voter");
        match self.search_via_api(voter_id).await {
            Ok(outcome) => outcome,
            Err(api_err) => {
                warn!(error = %api_err, "search endpoint unreachable, falling back to UI");
                let mut state = self.state.lock().await;
                self.reconcile(&mut state);
                let result = timeout(
                    self.config.op_timeout,
                    self.search_via_ui(&mut state, voter_id),
                )
                .await;
                match flatten(result, "voter search", self.config.op_timeout) {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        warn!(error = %err, "UI search fallback failed");
                        self.capture_diagnostics(&state, "search").await;
                        SearchOutcome::failed(format!(
                            "Voter search failed: {}",
                            api_err.user_message()
                        ))
                    }
                }
            }
        }
    }

    async fn is_logged_in(&self) -> bool {
        let mut state = self.state.lock().await;
        self.reconcile(&mut state);
        state.logged_in
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.logged_in = false;
        state.page = None;
        if let Some(mut browser) = state.browser.take() {
            if let Err(err) = browser.close().await {
                warn!(error = %err, "browser close failed");
            }
            let _ = browser.wait().await;
        }
        self.alive.store(false, Ordering::SeqCst);
        info!("portal session closed");
    }
}

fn js_quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn flatten<T>(
    result: Result<Result<T, PortalError>, tokio::time::error::Elapsed>,
    what: &str,
    waited: Duration,
) -> Result<T, PortalError> {
    match result {
        Ok(inner) => inner,
        Err(_) => Err(PortalError::timeout(what, waited)),
    }
}
