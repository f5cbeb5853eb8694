//! Documentation index for well-known exception classes

use std::collections::HashMap;

const JAVA_SE_API: &str = "https://docs.oracle.com/en/java/javase/21/docs/api";

/// Documentation page for an exception class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Documentation {
    pub class_name: String,
    pub url: String,
    pub summary: String,
}

/// Lookup table from fully qualified class name to documentation
#[derive(Debug, Clone, Default)]
pub struct DocIndex {
    entries: HashMap<String, Documentation>,
}

/// (module, class, summary)
const BUILTIN: &[(&str, &str, &str)] = &[
    (
        "java.base",
        "java.lang.NullPointerException",
        "Thrown when an application attempts to use null in a case where an object is required.",
    ),
    (
        "java.base",
        "java.lang.ClassCastException",
        "Thrown to indicate that the code has attempted to cast an object to a subclass of which it is not an instance.",
    ),
    (
        "java.base",
        "java.lang.ArrayIndexOutOfBoundsException",
        "Thrown to indicate that an array has been accessed with an illegal index.",
    ),
    (
        "java.base",
        "java.lang.IndexOutOfBoundsException",
        "Thrown to indicate that an index of some sort is out of range.",
    ),
    (
        "java.base",
        "java.lang.IllegalArgumentException",
        "Thrown to indicate that a method has been passed an illegal or inappropriate argument.",
    ),
    (
        "java.base",
        "java.lang.IllegalStateException",
        "Signals that a method has been invoked at an illegal or inappropriate time.",
    ),
    (
        "java.base",
        "java.lang.NumberFormatException",
        "Thrown to indicate that the application has attempted to convert a string to one of the numeric types, but that the string does not have the appropriate format.",
    ),
    (
        "java.base",
        "java.lang.ClassNotFoundException",
        "Thrown when an application tries to load in a class through its string name but no definition for the class with the specified name could be found.",
    ),
    (
        "java.base",
        "java.lang.NoClassDefFoundError",
        "Thrown if the Java Virtual Machine tries to load in the definition of a class and no definition of the class could be found.",
    ),
    (
        "java.base",
        "java.lang.NoSuchMethodError",
        "Thrown if an application tries to call a specified method of a class and that class no longer has a definition of that method.",
    ),
    (
        "java.base",
        "java.lang.StackOverflowError",
        "Thrown when a stack overflow occurs because an application recurses too deeply.",
    ),
    (
        "java.base",
        "java.lang.UnsupportedOperationException",
        "Thrown to indicate that the requested operation is not supported.",
    ),
    (
        "java.base",
        "java.util.ConcurrentModificationException",
        "Thrown by methods that have detected concurrent modification of an object when such modification is not permissible.",
    ),
    (
        "java.base",
        "java.util.NoSuchElementException",
        "Thrown by various accessor methods to indicate that the element being requested does not exist.",
    ),
    (
        "java.base",
        "java.io.FileNotFoundException",
        "Signals that an attempt to open the file denoted by a specified pathname has failed.",
    ),
    (
        "java.base",
        "java.io.IOException",
        "Signals that an I/O exception of some sort has occurred.",
    ),
];

impl DocIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index preloaded with common JDK exceptions
    pub fn builtin() -> Self {
        let mut index = Self::new();
        for (module, class_name, summary) in BUILTIN {
            let path = class_name.replace('.', "/");
            index.insert(Documentation {
                class_name: (*class_name).to_string(),
                url: format!("{JAVA_SE_API}/{module}/{path}.html"),
                summary: (*summary).to_string(),
            });
        }
        index
    }

    pub fn insert(&mut self, doc: Documentation) {
        self.entries.insert(doc.class_name.clone(), doc);
    }

    pub fn get(&self, class_name: &str) -> Option<&Documentation> {
        self.entries.get(class_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
