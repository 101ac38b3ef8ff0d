// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pipeline driver
//!
//! One run builds a fresh registry, obtains the document, awaits its syntax
//! tree and then its analysis, and hands back an [`AnalysisHandle`].

pub mod driver;
pub mod handle;

pub use driver::{PipelineDriver, PipelineDriverBuilder, run_analysis};
pub use handle::AnalysisHandle;
