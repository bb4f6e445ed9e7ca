use chrono::{DateTime, Utc};

use crate::domain::{MemoEntry, TodoItem, unique_id};

/// Puts a new todo at the top of the list. Blank text is ignored.
pub fn add_todo(todos: &[TodoItem], text: &str, now: DateTime<Utc>) -> Vec<TodoItem> {
    let text = text.trim();
    if text.is_empty() {
        return todos.to_vec();
    }

    let todo = TodoItem {
        id: unique_id(todos.iter().map(|todo| todo.id.as_str())),
        text: text.to_string(),
        completed: false,
        created_at: now,
    };
    prepend(todo, todos)
}

pub fn toggle_todo(todos: &[TodoItem], todo_id: &str) -> Vec<TodoItem> {
    todos
        .iter()
        .map(|todo| {
            if todo.id == todo_id {
                TodoItem {
                    completed: !todo.completed,
                    ..todo.clone()
                }
            } else {
                todo.clone()
            }
        })
        .collect()
}

pub fn remove_todo(todos: &[TodoItem], todo_id: &str) -> Vec<TodoItem> {
    todos
        .iter()
        .filter(|todo| todo.id != todo_id)
        .cloned()
        .collect()
}

pub fn move_todo(todos: &[TodoItem], todo_id: &str, to_index: usize) -> Vec<TodoItem> {
    let mut next = todos.to_vec();
    if let Some(from) = next.iter().position(|todo| todo.id == todo_id) {
        let todo = next.remove(from);
        next.insert(to_index.min(next.len()), todo);
    }
    next
}

pub fn add_memo(memos: &[MemoEntry], text: &str, now: DateTime<Utc>) -> Vec<MemoEntry> {
    let text = text.trim();
    if text.is_empty() {
        return memos.to_vec();
    }

    let memo = MemoEntry {
        id: unique_id(memos.iter().map(|memo| memo.id.as_str())),
        text: text.to_string(),
        created_at: now,
    };
    prepend(memo, memos)
}

pub fn remove_memo(memos: &[MemoEntry], memo_id: &str) -> Vec<MemoEntry> {
    memos
        .iter()
        .filter(|memo| memo.id != memo_id)
        .cloned()
        .collect()
}

fn prepend<T: Clone>(first: T, rest: &[T]) -> Vec<T> {
    let mut next = Vec::with_capacity(rest.len() + 1);
    next.push(first);
    next.extend_from_slice(rest);
    next
}
