//! Workflow state machine
//!
//! Nodes are an explicit enum; edges live in a `TransitionTable` keyed by
//! (node, outcome). The table is checked exhaustively when it is built:
//! every non-terminal node has exactly the outcomes it can produce wired,
//! terminals have no outgoing edges, and every node is reachable from
//! `Classify`.
//!
//! Edges:
//! ```text
//! classify --greeting-------------> greet
//! classify --rag_query------------> rewrite --> retrieve --> grade
//! classify --comparison-----------> deconstruct --> compare_retrieve --> synthesize
//! classify --summarization--------> retrieve --> summarize
//! classify --training_generation--> retrieve --> train
//! grade --generate--> generate | --rewrite--> rewrite | --give_up--> give_up
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use crate::errors::{Result, WorkflowError};
use crate::types::{Citations, ConversationTurn, GradeAction, Intent, ModelChoice};

/// Workflow nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Classify,
    Rewrite,
    Retrieve,
    Grade,
    Generate,
    Deconstruct,
    CompareRetrieve,
    Synthesize,
    Summarize,
    Train,
    Greet,
    GiveUp,
}

impl Node {
    pub const ALL: [Node; 12] = [
        Node::Classify,
        Node::Rewrite,
        Node::Retrieve,
        Node::Grade,
        Node::Generate,
        Node::Deconstruct,
        Node::CompareRetrieve,
        Node::Synthesize,
        Node::Summarize,
        Node::Train,
        Node::Greet,
        Node::GiveUp,
    ];

    /// Terminal nodes produce the answer and end the run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Node::Generate
                | Node::Synthesize
                | Node::Summarize
                | Node::Train
                | Node::Greet
                | Node::GiveUp
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Node::Classify => "classify",
            Node::Rewrite => "rewrite",
            Node::Retrieve => "retrieve",
            Node::Grade => "grade",
            Node::Generate => "generate",
            Node::Deconstruct => "deconstruct",
            Node::CompareRetrieve => "compare_retrieve",
            Node::Synthesize => "synthesize",
            Node::Summarize => "summarize",
            Node::Train => "train",
            Node::Greet => "greet",
            Node::GiveUp => "give_up",
        }
    }

    /// Outcomes this node can report when it finishes
    pub fn outcomes(&self) -> Vec<Outcome> {
        match self {
            Node::Classify => vec![
                Outcome::Classified(Intent::Greeting),
                Outcome::Classified(Intent::RagQuery),
                Outcome::Classified(Intent::Comparison),
                Outcome::Classified(Intent::Summarization),
                Outcome::Classified(Intent::TrainingGeneration),
            ],
            Node::Rewrite | Node::Deconstruct | Node::CompareRetrieve => vec![Outcome::Continue],
            Node::Retrieve => vec![
                Outcome::Retrieved(Intent::RagQuery),
                Outcome::Retrieved(Intent::Summarization),
                Outcome::Retrieved(Intent::TrainingGeneration),
            ],
            Node::Grade => vec![
                Outcome::Graded(GradeAction::Generate),
                Outcome::Graded(GradeAction::Rewrite),
                Outcome::Graded(GradeAction::GiveUp),
            ],
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result a node reports to select the next edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Classification picked a mode
    Classified(Intent),
    /// Unconditional edge
    Continue,
    /// Retrieval finished; carries the mode that dispatched into it
    Retrieved(Intent),
    /// Grader verdict
    Graded(GradeAction),
}

/// Validated (node, outcome) -> node table
#[derive(Debug, Clone)]
pub struct TransitionTable {
    edges: HashMap<(Node, Outcome), Node>,
}

impl TransitionTable {
    /// The routing table of the document Q&A workflow
    pub fn standard() -> Result<Self> {
        use GradeAction as G;
        use Intent as I;

        Self::from_edges(&[
            (Node::Classify, Outcome::Classified(I::Greeting), Node::Greet),
            (Node::Classify, Outcome::Classified(I::RagQuery), Node::Rewrite),
            (Node::Classify, Outcome::Classified(I::Comparison), Node::Deconstruct),
            (Node::Classify, Outcome::Classified(I::Summarization), Node::Retrieve),
            (Node::Classify, Outcome::Classified(I::TrainingGeneration), Node::Retrieve),
            (Node::Rewrite, Outcome::Continue, Node::Retrieve),
            (Node::Retrieve, Outcome::Retrieved(I::RagQuery), Node::Grade),
            (Node::Retrieve, Outcome::Retrieved(I::Summarization), Node::Summarize),
            (Node::Retrieve, Outcome::Retrieved(I::TrainingGeneration), Node::Train),
            (Node::Grade, Outcome::Graded(G::Generate), Node::Generate),
            (Node::Grade, Outcome::Graded(G::Rewrite), Node::Rewrite),
            (Node::Grade, Outcome::Graded(G::GiveUp), Node::GiveUp),
            (Node::Deconstruct, Outcome::Continue, Node::CompareRetrieve),
            (Node::CompareRetrieve, Outcome::Continue, Node::Synthesize),
        ])
    }

    /// Build and validate a table from explicit edges
    pub fn from_edges(edges: &[(Node, Outcome, Node)]) -> Result<Self> {
        let mut map = HashMap::new();
        for &(from, outcome, to) in edges {
            if map.insert((from, outcome), to).is_some() {
                return Err(invalid(from, to, format!("duplicate edge on {:?}", outcome)));
            }
        }

        let table = Self { edges: map };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        for (&(from, outcome), &to) in &self.edges {
            if from.is_terminal() {
                return Err(invalid(from, to, "terminal nodes have no outgoing edges".to_string()));
            }
            if !from.outcomes().contains(&outcome) {
                return Err(invalid(from, to, format!("{} never reports {:?}", from, outcome)));
            }
        }

        for node in Node::ALL {
            for outcome in node.outcomes() {
                if !self.edges.contains_key(&(node, outcome)) {
                    return Err(WorkflowError::InvalidTransition {
                        from: node.to_string(),
                        to: "(missing)".to_string(),
                        reason: format!("no edge for {:?}", outcome),
                    });
                }
            }
        }

        let reachable = self.reachable_from(Node::Classify);
        if let Some(node) = Node::ALL.iter().find(|node| !reachable.contains(*node)) {
            return Err(WorkflowError::InvalidTransition {
                from: Node::Classify.to_string(),
                to: node.to_string(),
                reason: "node is unreachable".to_string(),
            });
        }

        Ok(())
    }

    fn reachable_from(&self, start: Node) -> HashSet<Node> {
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for outcome in node.outcomes() {
                if let Some(&next) = self.edges.get(&(node, outcome)) {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        seen
    }

    /// Next node for a finished node and its outcome
    pub fn next(&self, from: Node, outcome: Outcome) -> Result<Node> {
        self.edges
            .get(&(from, outcome))
            .copied()
            .ok_or_else(|| WorkflowError::InvalidTransition {
                from: from.to_string(),
                to: format!("(via {:?})", outcome),
                reason: format!("no transition from {} on {:?}", from, outcome),
            })
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

fn invalid(from: Node, to: Node, reason: String) -> WorkflowError {
    WorkflowError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
        reason,
    }
}

/// Caller input for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub question: String,
    #[serde(default)]
    pub chat_history: Vec<ConversationTurn>,
    #[serde(default)]
    pub model_choice: ModelChoice,
}

impl WorkflowRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            chat_history: Vec::new(),
            model_choice: ModelChoice::default(),
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.chat_history = history;
        self
    }

    pub fn with_model(mut self, choice: ModelChoice) -> Self {
        self.model_choice = choice;
        self
    }
}

/// Sub-query contexts in plan order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedContext {
    entries: Vec<(String, String)>,
}

impl AggregatedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, subquery: impl Into<String>, context: impl Into<String>) {
        self.entries.push((subquery.into(), context.into()));
    }

    pub fn get(&self, subquery: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == subquery)
            .map(|(_, context)| context.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, context)| (key.as_str(), context.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys are exactly `plan`, in order
    pub fn matches_plan(&self, plan: &[String]) -> bool {
        self.keys().eq(plan.iter().map(String::as_str))
    }
}

/// Mutable state of one request as it moves through the nodes
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// Starts as the user's question; rewriting replaces it
    pub question: String,
    pub chat_history: Vec<ConversationTurn>,
    pub model_choice: ModelChoice,
    /// Set by classification
    pub intent: Option<Intent>,
    pub context: String,
    pub citations: Citations,
    pub rewrite_count: u32,
    pub plan: Vec<String>,
    pub aggregated_context: AggregatedContext,
    answer: Option<String>,
}

impl WorkflowState {
    pub fn new(request: WorkflowRequest) -> Self {
        Self {
            question: request.question,
            chat_history: request.chat_history,
            model_choice: request.model_choice,
            intent: None,
            context: String::new(),
            citations: Citations::new(),
            rewrite_count: 0,
            plan: Vec::new(),
            aggregated_context: AggregatedContext::new(),
            answer: None,
        }
    }

    /// Record the final answer; a second write is a bug
    pub fn set_answer(&mut self, answer: String) -> Result<()> {
        if self.answer.is_some() {
            return Err(WorkflowError::Generic("answer already set for this request".to_string()));
        }
        self.answer = Some(answer);
        Ok(())
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn take_answer(&mut self) -> Option<String> {
        self.answer.take()
    }
}
