//! 账号存储操作

use super::SeaOrmStorage;
use crate::entity::profiles::Entity as Profiles;
use crate::entity::users::{ActiveModel, Column, Entity as Users};
use crate::errors::{CourseHubError, Result};
use crate::models::{
    profiles::requests::CreateProfileRequest,
    users::entities::{AuthUser, User, UserStatus},
};
use crate::realtime::{ChangeEvent, ChangeKind, ChangeTable};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建账号，可同时建档（同一事务）
    pub async fn create_user_impl(
        &self,
        email: &str,
        password_hash: &str,
        profile: Option<CreateProfileRequest>,
    ) -> Result<AuthUser> {
        let now = chrono::Utc::now().timestamp();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("开启事务失败: {e}")))?;

        let exists = Users::find()
            .filter(Column::Email.eq(email))
            .one(&txn)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询用户失败: {e}")))?;
        if exists.is_some() {
            return Err(CourseHubError::conflict("Email is already registered"));
        }

        let user = ActiveModel {
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            status: Set(UserStatus::Active.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CourseHubError::database_operation(format!("创建用户失败: {e}")))?;

        let profile = match profile {
            Some(req) => Some(Self::insert_profile(&txn, user.id, email, req, now).await?),
            None => None,
        };

        txn.commit()
            .await
            .map_err(|e| CourseHubError::database_operation(format!("提交事务失败: {e}")))?;

        if let Some(p) = &profile {
            self.changes
                .publish(ChangeEvent::new(ChangeTable::Profiles, ChangeKind::Insert, p.id));
        }

        Ok(AuthUser {
            user: user.into_user(),
            profile: profile.map(|p| p.into_profile()),
        })
    }

    /// 通过 ID 获取账号
    pub async fn get_user_by_id_impl(&self, id: i64) -> Result<Option<User>> {
        let result = Users::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 通过邮箱获取账号
    pub async fn get_user_by_email_impl(&self, email: &str) -> Result<Option<User>> {
        let result = Users::find()
            .filter(Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 账号及其资料
    pub async fn get_auth_user_impl(&self, id: i64) -> Result<Option<AuthUser>> {
        let result = Users::find_by_id(id)
            .find_also_related(Profiles)
            .one(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|(user, profile)| AuthUser {
            user: user.into_user(),
            profile: profile.map(|p| p.into_profile()),
        }))
    }

    /// 更新最后登录时间
    pub async fn update_last_login_impl(&self, id: i64) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = Users::update_many()
            .col_expr(Column::LastLogin, sea_orm::sea_query::Expr::value(now))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("更新登录时间失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_users_impl(&self) -> Result<i64> {
        let count = Users::find()
            .count(&self.db)
            .await
            .map_err(|e| CourseHubError::database_operation(format!("统计用户失败: {e}")))?;
        Ok(count as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support;
    use crate::models::profiles::entities::UserRole;

    #[tokio::test]
    async fn test_create_user_with_profile() {
        let storage = test_support::storage().await;
        let created = test_support::user(&storage, "Ada", UserRole::Lecturer).await;
        assert_eq!(created.role(), Some(UserRole::Lecturer));

        let loaded = storage
            .get_auth_user_impl(created.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.user.email, "ada@uni.edu");
        assert_eq!(loaded.profile.unwrap().full_name, "Ada");
        assert_eq!(storage.count_users_impl().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let storage = test_support::storage().await;
        storage
            .create_user_impl("dup@uni.edu", "hash", None)
            .await
            .unwrap();
        let err = storage
            .create_user_impl("dup@uni.edu", "hash", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "E010");
    }

    #[tokio::test]
    async fn test_user_without_profile() {
        let storage = test_support::storage().await;
        let created = storage
            .create_user_impl("new@uni.edu", "hash", None)
            .await
            .unwrap();
        assert!(created.profile.is_none());
        assert!(storage.update_last_login_impl(created.id()).await.unwrap());
        let user = storage
            .get_user_by_email_impl("new@uni.edu")
            .await
            .unwrap()
            .unwrap();
        assert!(user.last_login.is_some());
    }
}
