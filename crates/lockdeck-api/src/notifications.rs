// Notification service endpoints

use crate::class::RequestClass;
use crate::client::{LockClient, Request};
use crate::error::Error;
use crate::models::{NotificationPage, NotificationQuery};

impl LockClient {
    /// `GET /notifications?unread_only=&limit=`
    pub async fn list_notifications(
        &self,
        query: NotificationQuery,
    ) -> Result<NotificationPage, Error> {
        let request = Request::get("notifications", RequestClass::Notification)
            .query("unread_only", query.unread_only)
            .query("limit", query.limit);
        self.send(&request).await
    }

    /// `PUT /notifications/{id}/read`
    pub async fn mark_notification_read(&self, id: u64) -> Result<(), Error> {
        self.send_unit(&Request::put(
            format!("notifications/{id}/read"),
            RequestClass::Notification,
        ))
        .await
    }

    /// `PUT /notifications/read-all`
    pub async fn mark_all_notifications_read(&self) -> Result<(), Error> {
        self.send_unit(&Request::put(
            "notifications/read-all",
            RequestClass::Notification,
        ))
        .await
    }

    /// `DELETE /notifications/{id}`
    pub async fn delete_notification(&self, id: u64) -> Result<(), Error> {
        self.send_unit(&Request::delete(
            format!("notifications/{id}"),
            RequestClass::Notification,
        ))
        .await
    }
}
