use anyhow::Result;
use log::*;
use std::time::Instant;

use crate::api_client::{ApiClient, ProfileUpdate};
use crate::auth::{login, AccessToken, UserCredentials};
use crate::config::{Config, ScenarioChoice};
use crate::error::Error;
use crate::output::{
    print_failure, print_header, print_json, print_ok, print_step, print_verification, TestResult,
};
use crate::session::Session;

const AUTH_FLOW: &str = "auth_flow";
const SINGLE_FLOW: &str = "single_flow";
const REPEATED_UPDATE: &str = "repeated_update";
const REJECTED_UPDATE: &str = "rejected_update";
const INVALID_LOGIN: &str = "invalid_login";

/// Sent as the bearer token when an update must be refused.
const INVALID_TOKEN: &str = "invalid-token";

/// What a scenario concluded once every call it needed went through.
struct Check {
    passed: bool,
    message: String,
}

/// Runs whatever `config.scenario` selects and returns one result per scenario run.
pub async fn run(config: &Config) -> Result<Vec<TestResult>> {
    let results = match config.scenario {
        ScenarioChoice::AuthFlow => vec![test_auth_flow(config).await?],
        ScenarioChoice::SingleFlow => vec![test_single_flow(config, config.phone()).await?],
        ScenarioChoice::RepeatedUpdates => test_repeated_updates(config).await?,
        ScenarioChoice::FormSuite => test_form_suite(config).await?,
        ScenarioChoice::RejectedUpdate => vec![test_rejected_update(config).await?],
        ScenarioChoice::InvalidLogin => vec![test_invalid_login(config).await?],
        ScenarioChoice::All => {
            let mut results = vec![test_auth_flow(config).await?];
            results.extend(test_form_suite(config).await?);
            results.push(test_rejected_update(config).await?);
            results.push(test_invalid_login(config).await?);
            results
        }
    };
    Ok(results)
}

/// Login, read, update and an immediate verifying read.
///
/// A login without an access token is tolerated here; the remaining calls then
/// authenticate with the session cookies alone.
pub async fn test_auth_flow(config: &Config) -> Result<TestResult> {
    let start = Instant::now();
    print_header("TEST: Auth Flow");
    let result = auth_flow(config).await;
    conclude(AUTH_FLOW, start, result)
}

async fn auth_flow(config: &Config) -> Result<Check, Error> {
    let credentials = config.credentials()?;

    print_step("Logging in...");
    let outcome = login(config.frontend_url(), &credentials).await?;
    print_ok("Login successful");
    println!(
        "   User: {}",
        outcome.username.as_deref().unwrap_or("not available")
    );

    match &outcome.token {
        Some(token) => print_ok(&format!("Using token: {}", token.preview())),
        None => warn!("No access token issued, continuing with cookie authentication"),
    }

    let client = ApiClient::new(&outcome.session, outcome.token.as_ref());

    print_step("Fetching profile...");
    let profile = client.get_profile().await?;
    print_ok("Profile fetched");
    if let Ok(value) = serde_json::to_value(&profile) {
        print_json(&value);
    }
    println!(
        "   Current phone: {}",
        profile.phone.as_deref().unwrap_or("no phone")
    );

    let new_phone = config.auth_flow_phone();
    print_step(&format!("Updating phone to {}...", new_phone));
    let echo = client.update_profile(&ProfileUpdate::phone(new_phone)).await?;
    print_ok("Profile updated");
    if let Ok(value) = serde_json::to_value(&echo) {
        print_json(&value);
    }

    print_step("Verifying the change was saved...");
    let verification = client.verify(new_phone).await?;
    print_verification(&verification);

    Ok(Check {
        passed: verification.passed(),
        message: format!(
            "Expected: '{}', Actual: '{}'",
            verification.expected,
            verification.actual.as_deref().unwrap_or("")
        ),
    })
}

/// One round trip of the profile form: login, load, save, wait, re-read.
pub async fn test_single_flow(config: &Config, phone: &str) -> Result<TestResult> {
    let start = Instant::now();
    print_header("TEST: Profile Form Flow");
    let result = single_flow(config, phone).await;
    conclude(SINGLE_FLOW, start, result)
}

async fn single_flow(config: &Config, new_phone: &str) -> Result<Check, Error> {
    let credentials = config.credentials()?;

    print_step("Step 1: Login...");
    let outcome = login(config.frontend_url(), &credentials).await?;
    let token = outcome.require_token()?;
    print_ok("Login successful");

    let client = ApiClient::new(&outcome.session, Some(token));

    print_step("Step 2: Loading initial profile...");
    let profile = client.get_profile().await?;
    let original_phone = profile.phone_or_empty().to_string();
    print_ok(&format!("Profile loaded - current phone: '{}'", original_phone));

    print_step(&format!(
        "Step 3: Changing phone from '{}' to '{}'",
        original_phone, new_phone
    ));

    print_step("Step 4: Sending update...");
    let echo = client.update_profile(&ProfileUpdate::phone(new_phone)).await?;
    print_ok(&format!(
        "Update accepted: {}",
        echo.message().unwrap_or("no message")
    ));

    print_step("Step 5: Verifying, as the form would...");
    tokio::time::sleep(config.settle_delay()).await;
    let verification = client.verify(new_phone).await?;
    print_verification(&verification);

    let final_phone = verification.actual.as_deref().unwrap_or("");
    let message = if verification.passed() {
        format!("Before: '{}', After: '{}'", original_phone, final_phone)
    } else {
        format!(
            "Expected: '{}', Actual: '{}', Original: '{}'",
            new_phone, final_phone, original_phone
        )
    };

    Ok(Check {
        passed: verification.passed(),
        message,
    })
}

/// The single flow once per configured phone, stopping at the first failure.
pub async fn test_repeated_updates(config: &Config) -> Result<Vec<TestResult>> {
    print_header("TEST: Repeated Updates");

    let phones = config.repeat_phones();
    if phones.is_empty() {
        print_failure("No phones configured for repeated updates");
        return Ok(vec![TestResult::fail(
            REPEATED_UPDATE,
            "No phones configured".to_string(),
            std::time::Duration::ZERO,
        )]);
    }

    let total = phones.len();
    let mut results = Vec::with_capacity(total);

    for (i, phone) in phones.iter().enumerate() {
        let run = i + 1;
        println!("\n--- Run {}/{}: {} ---", run, total, phone);

        let mut result = test_single_flow(config, phone).await?;
        result.scenario = format!("{}[{}/{}]", REPEATED_UPDATE, run, total);
        let passed = result.passed;
        results.push(result);

        if !passed {
            print_failure(&format!("Failed at run {}", run));
            break;
        }
        print_ok(&format!("Run {} passed", run));

        if run < total {
            tokio::time::sleep(config.iteration_pause()).await;
        }
    }

    Ok(results)
}

/// The single flow, followed by the repeated updates only if it passed.
pub async fn test_form_suite(config: &Config) -> Result<Vec<TestResult>> {
    let first = test_single_flow(config, config.phone()).await?;

    if !first.passed {
        print_failure("The basic flow failed, skipping repeated updates");
        return Ok(vec![first]);
    }

    let mut results = vec![first];
    results.extend(test_repeated_updates(config).await?);
    Ok(results)
}

/// An update carrying an invalid token must be refused and must leave the phone as it was.
pub async fn test_rejected_update(config: &Config) -> Result<TestResult> {
    let start = Instant::now();
    print_header("TEST: Rejected Update");
    let result = rejected_update(config).await;
    conclude(REJECTED_UPDATE, start, result)
}

async fn rejected_update(config: &Config) -> Result<Check, Error> {
    let credentials = config.credentials()?;

    print_step("Logging in to read the current phone...");
    let outcome = login(config.frontend_url(), &credentials).await?;
    let token = outcome.require_token()?;
    let client = ApiClient::new(&outcome.session, Some(token));

    let original_phone = client.get_profile().await?.phone_or_empty().to_string();
    print_ok(&format!("Current phone: '{}'", original_phone));

    let attempted_phone =
        phone_other_than(&original_phone, &[config.phone(), config.auth_flow_phone()]);

    // Fresh session so no login cookie can authorize the request.
    print_step(&format!(
        "Updating phone to '{}' with an invalid token...",
        attempted_phone
    ));
    let intruder = Session::new(config.frontend_url())?;
    let invalid_token = AccessToken::new(INVALID_TOKEN);
    let attempt = ApiClient::new(&intruder, Some(&invalid_token))
        .update_profile(&ProfileUpdate::phone(&attempted_phone))
        .await;

    match attempt {
        Err(Error::Status { status, .. }) => {
            print_ok(&format!("Update rejected with {}", status));
        }
        Ok(_) | Err(Error::Decode { .. }) => {
            print_failure("Update with an invalid token was accepted");
            return Ok(Check {
                passed: false,
                message: "Update with an invalid token was accepted".to_string(),
            });
        }
        Err(e) => return Err(e),
    }

    print_step("Checking the stored phone is unchanged...");
    let current_phone = client.get_profile().await?.phone_or_empty().to_string();

    if current_phone == original_phone {
        print_ok(&format!("Phone unchanged: '{}'", current_phone));
        Ok(Check {
            passed: true,
            message: format!("Phone unchanged: '{}'", current_phone),
        })
    } else {
        print_failure(&format!(
            "Phone changed by a rejected update. Expected: '{}', Actual: '{}'",
            original_phone, current_phone
        ));
        Ok(Check {
            passed: false,
            message: format!(
                "Expected: '{}', Actual: '{}'",
                original_phone, current_phone
            ),
        })
    }
}

/// First candidate differing from `current`, or `current` with a digit
/// appended when every candidate equals it.
fn phone_other_than(current: &str, candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|candidate| **candidate != current)
        .map(|candidate| candidate.to_string())
        .unwrap_or_else(|| format!("{}0", current))
}

/// A login with the wrong password must fail and issue no token.
pub async fn test_invalid_login(config: &Config) -> Result<TestResult> {
    let start = Instant::now();
    print_header("TEST: Invalid Login");
    let result = invalid_login(config).await;
    conclude(INVALID_LOGIN, start, result)
}

async fn invalid_login(config: &Config) -> Result<Check, Error> {
    let account = config.credentials()?;
    let wrong_password = format!("{}-not-the-password", account.password);
    let credentials = UserCredentials::new(&account.email, &wrong_password)?;

    print_step("Logging in with a wrong password...");
    match login(config.frontend_url(), &credentials).await {
        Err(Error::Status { status, .. }) => {
            print_ok(&format!("Login refused with {}", status));
            Ok(Check {
                passed: true,
                message: format!("Login refused with {}", status),
            })
        }
        Ok(outcome) => {
            let message = format!(
                "Login accepted a wrong password (token issued: {})",
                if outcome.token.is_some() { "yes" } else { "no" }
            );
            print_failure(&message);
            Ok(Check {
                passed: false,
                message,
            })
        }
        Err(e) => Err(e),
    }
}

/// Turns a scenario's outcome into a result. Transport faults abort the run;
/// every other error fails only this scenario.
fn conclude(scenario: &str, start: Instant, result: Result<Check, Error>) -> Result<TestResult> {
    match result {
        Ok(check) if check.passed => {
            info!("{} passed", scenario);
            Ok(TestResult::pass(
                scenario,
                Some(check.message),
                start.elapsed(),
            ))
        }
        Ok(check) => {
            warn!("{} failed: {}", scenario, check.message);
            Ok(TestResult::fail(scenario, check.message, start.elapsed()))
        }
        Err(e) if e.is_transport() => Err(e.into()),
        Err(e) => {
            error!("{} aborted: {}", scenario, e);
            print_failure(&e.to_string());
            match &e {
                Error::Status {
                    details: Some(details),
                    ..
                } => {
                    println!("   Error details:");
                    print_json(details);
                }
                Error::Status { details: None, .. } => {
                    debug!("Response body could not be parsed as JSON");
                }
                _ => {}
            }
            Ok(TestResult::fail(scenario, e.to_string(), start.elapsed()))
        }
    }
}
