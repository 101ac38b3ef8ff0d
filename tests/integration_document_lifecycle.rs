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

//! Integration tests for memoized, single-flight document productions

use analysis_harness::*;
use futures::future::{join, join3};
use std::sync::Arc;
use tokio::task::yield_now;
use tokio_util::sync::CancellationToken;

mod utils;
use utils::{ScriptedAnalyzer, init_logging, scripted_document};

#[tokio::test]
async fn test_concurrent_syntax_requests_share_one_parse() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::gated());
    let document = scripted_document(&analyzer, "x = 1\ny = x", Default::default());
    let cancel = CancellationToken::new();

    let (first, second, ()) = join3(
        document.syntax_tree(&cancel),
        document.syntax_tree(&cancel),
        async {
            yield_now().await;
            assert_eq!(document.state(), DocumentState::SyntaxRequested);
            analyzer.open_gate();
        },
    )
    .await;

    let first = first.unwrap();
    let second = second.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.statements().len(), 2);
    assert_eq!(analyzer.parses(), 1);
    assert_eq!(document.syntax_launches(), 1);
    assert_eq!(document.state(), DocumentState::SyntaxReady);

    // cached: no further parse
    let third = document.syntax_tree(&cancel).await.unwrap();
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(analyzer.parses(), 1);
}

#[tokio::test]
async fn test_analysis_requested_first_waits_for_syntax() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::gated());
    let document = scripted_document(&analyzer, "a = 1\nb = a\nprint(b)", Default::default());
    let cancel = CancellationToken::new();

    let (analysis, syntax, ()) = join3(
        document.analysis(&cancel),
        document.syntax_tree(&cancel),
        async {
            yield_now().await;
            assert_eq!(document.state(), DocumentState::AnalysisRequested);
            assert_eq!(analyzer.analyses(), 0);
            analyzer.open_gate();
        },
    )
    .await;

    let analysis = analysis.unwrap();
    let syntax = syntax.unwrap();
    assert_eq!(analyzer.parses(), 1);
    assert_eq!(analyzer.analyses(), 1);
    assert_eq!(syntax.statements().len(), 3);
    assert_eq!(analysis.definitions.len(), 2);
    assert_eq!(document.state(), DocumentState::AnalysisReady);
}

#[tokio::test]
async fn test_failed_parse_is_not_cached() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::open().with_parse_failures(1));
    let document = scripted_document(&analyzer, "x = 1", Default::default());
    let cancel = CancellationToken::new();

    let error = document.syntax_tree(&cancel).await.unwrap_err();
    assert!(error.is_transient());
    assert_eq!(error.stage(), Some(Stage::SyntaxTree));
    assert_eq!(document.state(), DocumentState::SyntaxFailed);

    document.syntax_tree(&cancel).await.unwrap();
    assert_eq!(analyzer.parses(), 2);
    assert_eq!(document.state(), DocumentState::SyntaxReady);
}

#[tokio::test]
async fn test_failed_syntax_fails_analysis_until_retried() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::open().with_parse_failures(1));
    let sink = Arc::new(DiagnosticsAggregator::new());
    let document = scripted_document(&analyzer, "x = 1", Arc::clone(&sink));
    let cancel = CancellationToken::new();

    let error = document.analysis(&cancel).await.unwrap_err();
    assert_eq!(error.stage(), Some(Stage::SyntaxTree));
    assert_eq!(document.state(), DocumentState::AnalysisFailed);
    assert_eq!(analyzer.analyses(), 0);
    assert!(sink.is_empty());

    let analysis = document.analysis(&cancel).await.unwrap();
    assert_eq!(analysis.definitions.len(), 1);
    assert_eq!(analyzer.parses(), 2);
    assert_eq!(sink.for_document(document.uri()).len(), 1);
}

#[tokio::test]
async fn test_cancellation_reverts_to_created() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::gated());
    let document = scripted_document(&analyzer, "x = 1", Default::default());
    let cancel = CancellationToken::new();

    let (result, ()) = join(document.syntax_tree(&cancel), async {
        yield_now().await;
        cancel.cancel();
    })
    .await;

    assert_eq!(result.unwrap_err(), HarnessError::Cancelled);
    assert_eq!(document.state(), DocumentState::Created);

    analyzer.open_gate();
    document.syntax_tree(&CancellationToken::new()).await.unwrap();
    assert_eq!(document.syntax_launches(), 2);
    assert_eq!(analyzer.parses(), 2);
}

#[tokio::test]
async fn test_cancelled_analysis_publishes_nothing() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::gated());
    let sink = Arc::new(DiagnosticsAggregator::new());
    let document = scripted_document(&analyzer, "x = 1", Arc::clone(&sink));
    let cancel = CancellationToken::new();

    let (result, ()) = join(document.analysis(&cancel), async {
        yield_now().await;
        cancel.cancel();
    })
    .await;

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(document.state(), DocumentState::Created);
    assert_eq!(analyzer.analyses(), 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_concurrent_analysis_requests_share_one_analyze() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::open().with_gated_analysis());
    let sink = Arc::new(DiagnosticsAggregator::new());
    let document = scripted_document(&analyzer, "x = 1\nprint(x)", Arc::clone(&sink));
    let cancel = CancellationToken::new();

    let (first, second, ()) = join3(
        document.analysis(&cancel),
        document.analysis(&cancel),
        async {
            while analyzer.analyses() == 0 {
                yield_now().await;
            }
            yield_now().await;
            assert_eq!(document.state(), DocumentState::AnalysisRequested);
            analyzer.open_analysis_gate();
        },
    )
    .await;

    let first = first.unwrap();
    let second = second.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(analyzer.analyses(), 1);
    assert_eq!(document.analysis_launches(), 1);
    assert_eq!(sink.for_document(document.uri()).len(), 1);
    assert_eq!(document.state(), DocumentState::AnalysisReady);
}

#[tokio::test]
async fn test_cancelled_analysis_keeps_the_syntax_tree() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::open().with_gated_analysis());
    let sink = Arc::new(DiagnosticsAggregator::new());
    let document = scripted_document(&analyzer, "x = 1", Arc::clone(&sink));
    let cancel = CancellationToken::new();

    let syntax = document.syntax_tree(&cancel).await.unwrap();
    assert_eq!(document.state(), DocumentState::SyntaxReady);

    let (result, ()) = join(document.analysis(&cancel), async {
        while analyzer.analyses() == 0 {
            yield_now().await;
        }
        assert_eq!(document.state(), DocumentState::AnalysisRequested);
        cancel.cancel();
    })
    .await;

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(document.state(), DocumentState::SyntaxReady);
    assert!(sink.is_empty());

    analyzer.open_analysis_gate();
    document.analysis(&CancellationToken::new()).await.unwrap();
    assert_eq!(document.analysis_launches(), 2);
    assert_eq!(analyzer.parses(), 1);
    assert!(Arc::ptr_eq(
        &syntax,
        &document.syntax_tree(&CancellationToken::new()).await.unwrap()
    ));
}

#[tokio::test]
async fn test_one_cancelled_waiter_leaves_the_production_running() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::gated());
    let document = scripted_document(&analyzer, "x = 1", Default::default());
    let patient = CancellationToken::new();
    let impatient = CancellationToken::new();

    let (kept, dropped, ()) = join3(
        document.syntax_tree(&patient),
        document.syntax_tree(&impatient),
        async {
            yield_now().await;
            impatient.cancel();
            yield_now().await;
            analyzer.open_gate();
        },
    )
    .await;

    assert!(kept.is_ok());
    assert!(dropped.unwrap_err().is_cancelled());
    assert_eq!(analyzer.parses(), 1);
    assert_eq!(document.state(), DocumentState::SyntaxReady);
}

#[tokio::test]
async fn test_empty_analysis_is_a_contract_violation() {
    init_logging();
    let analyzer = Arc::new(ScriptedAnalyzer::open().with_empty_analysis());
    let document = scripted_document(&analyzer, "x = 1", Default::default());
    let cancel = CancellationToken::new();

    let error = document.analysis(&cancel).await.unwrap_err();
    assert!(error.is_contract_violation());
    assert_eq!(
        error,
        HarnessError::ContractViolation {
            stage: Stage::Analysis
        }
    );
    assert_eq!(document.state(), DocumentState::AnalysisFailed);

    // the syntax tree stays cached
    document.syntax_tree(&cancel).await.unwrap();
    assert_eq!(analyzer.parses(), 1);
}
