use serde::Serialize;

/// Standard JSON envelope for every non-report response.
///
/// ```json
/// {
///   "success": false,
///   "data": null,
///   "message": "Missing required file: mark_scheme"
/// }
/// ```
///
/// The feedback report itself is returned bare; health checks and all errors use this
/// wrapper. Error responses carry `T::default()` as `data`, which for `()` is `null`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Error response with empty `data`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}
