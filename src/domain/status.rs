use serde::Serialize;

/// A fixed status entry: code, short message and an optional human-readable description.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusDescriptor {
    pub code: u16,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

const fn entry(
    code: u16,
    message: &'static str,
    description: Option<&'static str>,
) -> StatusDescriptor {
    StatusDescriptor {
        code,
        message,
        description,
    }
}

// Sorted by code; `lookup` relies on it.
static STATUS_TABLE: [StatusDescriptor; 14] = [
    entry(200, "OK", None),
    entry(201, "Created", None),
    entry(
        204,
        "No Content",
        Some("Request was successful, but payload has no content."),
    ),
    entry(
        205,
        "Reset Content",
        Some(
            "Request was successful, user agent needs to reset the document view for updated content.",
        ),
    ),
    entry(
        206,
        "Partial Content",
        Some("Request was successful in fulfilling the range request of the content."),
    ),
    entry(
        400,
        "Bad Request",
        Some("Required argument is missing or an argument is of wrong type."),
    ),
    entry(
        401,
        "Unathorized",
        Some("Required authorization credentials are missing or not valid."),
    ),
    entry(404, "Not Found", Some("Resource does not exist.")),
    entry(
        405,
        "Not Allowed",
        Some("The specified method is not allowed on this resource."),
    ),
    entry(
        408,
        "Request timeout",
        Some("The server timed out when trying to fulfill the request."),
    ),
    entry(409, "Conflict", Some("Resource already exists.")),
    entry(
        416,
        "Range Not Satisfiable",
        Some(
            "None of the ranges in the request's range field overlap the current extent of the selected resource or the set of ranges requested has been rejected due to invalid ranges or an excessive request of small or overlapping ranges.",
        ),
    ),
    entry(500, "Internal Server Error", None),
    entry(
        503,
        "Service Unavailable",
        Some(
            "the server is currently unable to handle the request due to a temporary overload or scheduled maintenance.",
        ),
    ),
];

/// Looks up the descriptor for `code`. Unknown codes yield `None`, never a fallback entry.
#[must_use]
pub fn lookup(code: u16) -> Option<&'static StatusDescriptor> {
    STATUS_TABLE
        .binary_search_by_key(&code, |d| d.code)
        .ok()
        .map(|idx| &STATUS_TABLE[idx])
}

/// All descriptors in ascending code order.
pub fn all() -> impl Iterator<Item = &'static StatusDescriptor> {
    STATUS_TABLE.iter()
}
