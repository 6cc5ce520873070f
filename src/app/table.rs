use crate::common::Method;
use std::fmt;

/// A bound path and the methods it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub methods: Vec<Method>,
    pub path: String,
}

impl Endpoint {
    pub fn methods_label(&self) -> String {
        self.methods
            .iter()
            .map(Method::as_ref)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Printable listing of an app's endpoints.
///
/// ```text
/// ┌─────────┬─────────┬──────────────────────┐
/// │ (index) │ methods │ path                 │
/// ├─────────┼─────────┼──────────────────────┤
/// │ 0       │ GET     │ /ExampleController/  │
/// └─────────┴─────────┴──────────────────────┘
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    endpoints: Vec<Endpoint>,
}

impl RouteTable {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    fn rows(&self) -> Vec<[String; 3]> {
        self.endpoints
            .iter()
            .enumerate()
            .map(|(index, endpoint)| {
                [index.to_string(), endpoint.methods_label(), endpoint.path.clone()]
            })
            .collect()
    }
}

const HEADERS: [&str; 3] = ["(index)", "methods", "path"];

fn border(f: &mut fmt::Formatter<'_>, widths: &[usize; 3], parts: [char; 3]) -> fmt::Result {
    let [left, middle, right] = parts;
    write!(f, "{left}")?;
    for (i, width) in widths.iter().enumerate() {
        if i > 0 {
            write!(f, "{middle}")?;
        }
        write!(f, "{}", "─".repeat(width + 2))?;
    }
    writeln!(f, "{right}")
}

fn row(f: &mut fmt::Formatter<'_>, widths: &[usize; 3], cells: [&str; 3]) -> fmt::Result {
    write!(f, "│")?;
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width - cell.chars().count();
        write!(f, " {cell}{} │", " ".repeat(pad))?;
    }
    writeln!(f)
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.rows();
        let mut widths = HEADERS.map(|h| h.chars().count());
        for cells in &rows {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        border(f, &widths, ['┌', '┬', '┐'])?;
        row(f, &widths, HEADERS)?;
        border(f, &widths, ['├', '┼', '┤'])?;
        for [index, methods, path] in &rows {
            row(f, &widths, [index.as_str(), methods.as_str(), path.as_str()])?;
        }
        border(f, &widths, ['└', '┴', '┘'])
    }
}
