use crate::TaskRef;

/// A transient, ordered bundle of tasks.
///
/// Groups are produced by the parallel-composition operator and exist only to
/// be composed further: they are never registered and never scheduled, and
/// they own none of their members. Chaining onto a group forms a complete
/// fan-in/fan-out boundary with every member.
#[derive(Debug, Clone, Default)]
pub struct Group {
    /// The member tasks, in composition order.
    pub members: Vec<TaskRef>,
}

impl Group {
    /// Make an empty group.
    pub fn new() -> Group {
        Group::default()
    }
}

impl From<TaskRef> for Group {
    fn from(task: TaskRef) -> Group {
        Group { members: vec![task] }
    }
}

/// An operand of the composition operators: either a single task or the
/// member list of a group.
#[derive(Debug, Clone)]
pub enum Operand {
    /// A single registered task.
    One(TaskRef),
    /// The members of a group, in order.
    Many(Vec<TaskRef>),
}

impl Operand {
    /// The tasks this operand stands for, in order.
    pub fn tasks(&self) -> &[TaskRef] {
        match self {
            Operand::One(task) => std::slice::from_ref(task),
            Operand::Many(tasks) => tasks,
        }
    }
}

impl From<TaskRef> for Operand {
    fn from(task: TaskRef) -> Operand {
        Operand::One(task)
    }
}

impl From<Group> for Operand {
    fn from(group: Group) -> Operand {
        Operand::Many(group.members)
    }
}

impl From<&Group> for Operand {
    fn from(group: &Group) -> Operand {
        Operand::Many(group.members.clone())
    }
}
