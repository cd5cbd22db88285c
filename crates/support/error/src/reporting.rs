/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use parking_lot::RwLock;
use std::sync::Mutex;

/// Host-supplied error reporting trait, e.g. forwarding to a Sentry-like system.
pub trait ApplicationErrorReporter: Sync + Send {
    fn report_error(&self, type_name: String, message: String);
}

struct DefaultApplicationErrorReporter;
impl ApplicationErrorReporter for DefaultApplicationErrorReporter {
    fn report_error(&self, _type_name: String, _message: String) {}
}

lazy_static::lazy_static! {
    pub(crate) static ref APPLICATION_ERROR_REPORTER: RwLock<Box<dyn ApplicationErrorReporter>> =
        RwLock::new(Box::new(DefaultApplicationErrorReporter));
}

pub fn set_application_error_reporter(reporter: Box<dyn ApplicationErrorReporter>) {
    *APPLICATION_ERROR_REPORTER.write() = reporter;
}

pub fn unset_application_error_reporter() {
    *APPLICATION_ERROR_REPORTER.write() = Box::new(DefaultApplicationErrorReporter)
}

pub fn report_error_to_app(type_name: String, message: String) {
    APPLICATION_ERROR_REPORTER
        .read()
        .report_error(type_name, message);
}

/// Test error reporter that captures reported errors.
#[derive(Default)]
pub struct TestErrorReporter {
    errors: Mutex<Vec<(String, String)>>,
}

impl TestErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_errors(&self) -> Vec<(String, String)> {
        self.errors.lock().unwrap().clone()
    }
}

impl ApplicationErrorReporter for TestErrorReporter {
    fn report_error(&self, type_name: String, message: String) {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push((type_name, message));
        }
    }
}
