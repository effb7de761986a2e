use serde_json::Value;

use crate::{Group, Operand, TaskRef};

/// The return expression of a graph builder.
///
/// The builder's final value is captured verbatim as a tree whose leaves are
/// either plain values or task references; when the run completes, every task
/// leaf is substituted by the task's final result. Most builders return a
/// `TaskRef`, a `Group` or a plain value and rely on the `From` conversions.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A plain value, passed through untouched.
    Value(Value),
    /// A task leaf, substituted by the task's result.
    Node(TaskRef),
    /// An ordered sequence of nested expressions.
    Seq(Vec<Outcome>),
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Outcome {
        Outcome::Value(value)
    }
}

impl From<TaskRef> for Outcome {
    fn from(task: TaskRef) -> Outcome {
        Outcome::Node(task)
    }
}

impl From<Group> for Outcome {
    fn from(group: Group) -> Outcome {
        Outcome::Seq(group.members.into_iter().map(Outcome::Node).collect())
    }
}

impl From<Operand> for Outcome {
    fn from(operand: Operand) -> Outcome {
        match operand {
            Operand::One(task) => Outcome::Node(task),
            Operand::Many(tasks) => Outcome::Seq(tasks.into_iter().map(Outcome::Node).collect()),
        }
    }
}

impl From<Vec<Outcome>> for Outcome {
    fn from(items: Vec<Outcome>) -> Outcome {
        Outcome::Seq(items)
    }
}

impl From<Vec<TaskRef>> for Outcome {
    fn from(tasks: Vec<TaskRef>) -> Outcome {
        Outcome::Seq(tasks.into_iter().map(Outcome::Node).collect())
    }
}

impl From<()> for Outcome {
    fn from(_: ()) -> Outcome {
        Outcome::Value(Value::Null)
    }
}
