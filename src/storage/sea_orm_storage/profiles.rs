//! 个人资料存储操作

use super::SeaOrmStorage;
use crate::entity::profiles::{ActiveModel, Entity as Profiles, Model};
use crate::errors::{CourseHubError, Result};
use crate::models::profiles::{
    entities::Profile,
    requests::{CreateProfileRequest, UpdateProfileRequest},
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};

impl SeaOrmStorage {
    pub(super) async fn insert_profile<C: ConnectionTrait>(
        conn: &C,
        user_id: i64,
        email: &str,
        req: CreateProfileRequest,
        now: i64,
    ) -> Result<Model> {
        ActiveModel {
            id: Set(user_id),
            email: Set(email.to_string()),
            full_name: Set(req.full_name),
            role: Set(req.role.to_string()),
            student_id: Set(req.student_id),
            lecturer_id: Set(req.lecturer_id),
            department: Set(req.department),
            year_of_study: Set(req.year_of_study),
            avatar_url: Set(req.avatar_url),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(|e| CourseHubError::database_operation(format!("创建资料失败: {e}")))
    }

    /// 建档（每个账号一次）
    pub async fn create_profile_impl(
        &self,
        user_id: i64,
        email: &str,
        req: CreateProfileRequest,
    ) -> Result<Profile> {
        if self.get_profile_impl(user_id).await?.is_some() {
            return Err(CourseHubError::conflict("Profile already exists"));
        }

        let now = chrono::Utc::now().timestamp();
        let model = Self::insert_profile(&self.db, user_id, email, req, now).await?;
        self.changes.publish(ChangeEvent::new(
            ChangeTable::Profiles,
            ChangeKind::Insert,
            model.id,
        ));
        Ok(model.into_profile())
    }

    pub async fn get_profile_impl(&self, id: i64) -> Result<Option<Profile>> {
        let result = Profiles::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询资料失败: {e}")))?;

        Ok(result.map(|m| m.into_profile()))
    }

    /// 更新资料（角色不可改）
    pub async fn update_profile_impl(
        &self,
        id: i64,
        update: UpdateProfileRequest,
    ) -> Result<Option<Profile>> {
        let Some(existing) = Profiles::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询资料失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();
        if let Some(full_name) = update.full_name {
            model.full_name = Set(full_name);
        }
        if let Some(student_id) = update.student_id {
            model.student_id = Set(Some(student_id));
        }
        if let Some(lecturer_id) = update.lecturer_id {
            model.lecturer_id = Set(Some(lecturer_id));
        }
        if let Some(department) = update.department {
            model.department = Set(Some(department));
        }
        if let Some(year) = update.year_of_study {
            model.year_of_study = Set(Some(year));
        }
        if let Some(avatar_url) = update.avatar_url {
            model.avatar_url = Set(Some(avatar_url));
        }
        model.updated_at = Set(chrono::Utc::now().timestamp());

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("更新资料失败: {e}")))?;

        self.changes
            .publish(ChangeEvent::new(ChangeTable::Profiles, ChangeKind::Update, id));
        Ok(Some(updated.into_profile()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::models::profiles::{entities::UserRole, requests::UpdateProfileRequest};

    #[tokio::test]
    async fn test_profile_created_once() {
        let storage = test_support::storage().await;
        let user = storage
            .create_user_impl("late@uni.edu", "hash", None)
            .await
            .unwrap();

        let profile = storage
            .create_profile_impl(
                user.id(),
                "late@uni.edu",
                test_support::profile("Late", UserRole::Student, "Maths"),
            )
            .await
            .unwrap();
        assert_eq!(profile.id, user.id());
        assert_eq!(profile.role, UserRole::Student);

        let again = storage
            .create_profile_impl(
                user.id(),
                "late@uni.edu",
                test_support::profile("Late", UserRole::Lecturer, "Maths"),
            )
            .await;
        assert_eq!(again.unwrap_err().code(), "E010");
    }

    #[tokio::test]
    async fn test_update_keeps_role() {
        let storage = test_support::storage().await;
        let user = test_support::user(&storage, "Bo", UserRole::Student).await;

        let updated = storage
            .update_profile_impl(
                user.id(),
                UpdateProfileRequest {
                    full_name: Some("Bo Li".into()),
                    year_of_study: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name, "Bo Li");
        assert_eq!(updated.year_of_study, Some(2));
        assert_eq!(updated.role, UserRole::Student);

        assert!(
            storage
                .update_profile_impl(9999, UpdateProfileRequest::default())
                .await
                .unwrap()
                .is_none()
        );
    }
}
