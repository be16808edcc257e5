// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        tools::{ToolInvocation, ToolOutput, ToolRunner},
        Result,
    },
    std::{cell::RefCell, path::Path},
};

/// A [ToolRunner] that records invocations instead of running them.
///
/// `pkgbuild` and `productbuild` invocations materialize a placeholder file
/// at their output path so callers observe the same filesystem state as with
/// the real tools.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: RefCell<Vec<ToolInvocation>>,
    fail_program: Option<String>,
    uti: Option<String>,
}

impl RecordingRunner {
    /// Make every invocation of `program` exit with status 1.
    pub fn fail_program(mut self, program: &str) -> Self {
        self.fail_program = Some(program.to_string());
        self
    }

    /// Set the value `mdls` reports.
    pub fn uti(mut self, value: &str) -> Self {
        self.uti = Some(value.to_string());
        self
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(|invocation| invocation.program.clone())
            .collect()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        self.invocations.borrow_mut().push(invocation.clone());

        if self.fail_program.as_deref() == Some(invocation.program.as_str()) {
            return Ok(ToolOutput {
                code: Some(1),
                stdout: format!("{} output", invocation.program).into_bytes(),
                stderr: format!("{}: error: bad input", invocation.program).into_bytes(),
            });
        }

        let stdout = match invocation.program.as_str() {
            "pkgbuild" | "productbuild" => {
                if let Some(output) = invocation.args.last() {
                    std::fs::write(Path::new(output), b"xar!")?;
                }
                vec![]
            }
            "mdls" => self
                .uti
                .clone()
                .unwrap_or_else(|| "public.rtf".to_string())
                .into_bytes(),
            _ => vec![],
        };

        Ok(ToolOutput {
            code: Some(0),
            stdout,
            stderr: vec![],
        })
    }
}
