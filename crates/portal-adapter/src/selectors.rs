//! The portal's DOM contract.
//!
//! These ids are fixed by the portal front-end; automation addresses
//! elements by id only and never falls back to structural selectors.

pub const APP_CONTAINER: &str = "#app-container";
pub const AUTH_CONTAINER: &str = "#auth-container";

// Login view
pub const LOGIN_EMAIL: &str = "#loginEmail";
pub const LOGIN_PASSWORD: &str = "#loginPassword";
pub const LOGIN_FORM: &str = "#loginForm";
pub const LOGIN_RESPONSE: &str = "#loginResponse";

// Signup view, two phases around OTP verification
pub const SHOW_SIGNUP: &str = "#show-signup";
pub const SIGNUP_VIEW: &str = "#signup-view";
pub const SIGNUP_MOBILE: &str = "#signupMobile";
pub const OTP_SEND_FORM: &str = "#otpSendForm";
pub const OTP_RESPONSE: &str = "#otpResponse";
pub const OTP_VERIFY_FORM: &str = "#otpVerifyForm";
pub const SIGNUP_OTP: &str = "#signupOtp";
pub const SIGNUP_PHASE_2: &str = "#signup-phase-2";
pub const SIGNUP_EMAIL: &str = "#signupEmail";
pub const SIGNUP_PASSWORD: &str = "#signupPassword";
pub const SIGNUP_FORM: &str = "#signupForm";
pub const SIGNUP_RESPONSE: &str = "#signupResponse";

// Registration tab: aadhaar sub-form gates the main form
pub const REGISTER_TAB_BTN: &str = "#register-tab-btn";
pub const AADHAAR: &str = "#aadhaar";
pub const AADHAAR_FORM: &str = "#aadhaarForm";
pub const REGISTRATION_STEP: &str = "#registrationStep";
pub const REGISTRATION_FORM: &str = "#registrationForm";
pub const REGISTRATION_RESPONSE: &str = "#registrationResponse";

// Status tab
pub const STATUS_TAB_BTN: &str = "#status-tab-btn";
pub const STATUS_FORM: &str = "#statusForm";
pub const APPLICATION_ID: &str = "#applicationId";
pub const STATUS_RESPONSE: &str = "#statusResponse";

// Search tab (UI fallback path; the preferred path is the HTTP endpoint)
pub const SEARCH_TAB_BTN: &str = "#search-tab-btn";
pub const SEARCH_FORM: &str = "#searchForm";
pub const SEARCH_TYPE: &str = "#searchType";
pub const SEARCH_VOTER_ID: &str = "#searchVoterId";
pub const SEARCH_RESPONSE: &str = "#searchResponse";

/// Response panels signal outcome through these CSS classes.
pub const CLASS_SUCCESS: &str = "success";
pub const CLASS_SHOW: &str = "show";

/// Public search endpoint, relative to the portal base URL.
pub const SEARCH_ENDPOINT: &str = "/api/search/voter";
